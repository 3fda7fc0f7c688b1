//! # Channel Settings
//!
//! Per-channel configuration, created lazily with defaults on first access and
//! mutated only through mod-gated commands. Nothing is persisted.

use serde::Serialize;
use std::collections::HashMap;

use crate::domain::config::TuningConfig;
use crate::domain::types::ChannelName;

/// Serialized in camelCase because the webhook receives it as `flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    pub queue_enabled: bool,
    pub cooldown_ms: u64,
    pub safe_mode: bool,
    pub lockdown: bool,
    pub max_prompt_len: usize,
}

/// A partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub queue_enabled: Option<bool>,
    pub cooldown_ms: Option<u64>,
    pub safe_mode: Option<bool>,
    pub lockdown: Option<bool>,
    pub max_prompt_len: Option<usize>,
}

pub struct SettingsStore {
    defaults: ChannelSettings,
    channels: HashMap<ChannelName, ChannelSettings>,
}

impl SettingsStore {
    pub fn new(tuning: &TuningConfig) -> Self {
        Self {
            defaults: ChannelSettings {
                queue_enabled: false,
                cooldown_ms: tuning.default_cooldown_ms,
                safe_mode: true,
                lockdown: false,
                max_prompt_len: tuning.max_prompt_len_default,
            },
            channels: HashMap::new(),
        }
    }

    /// Current settings for a channel, creating the default entry on miss.
    pub fn get(&mut self, channel: &ChannelName) -> ChannelSettings {
        self.entry(channel).clone()
    }

    /// Merge `patch` over the current settings and return the new snapshot.
    pub fn set(&mut self, channel: &ChannelName, patch: SettingsPatch) -> ChannelSettings {
        let current = self.entry(channel);
        if let Some(v) = patch.queue_enabled {
            current.queue_enabled = v;
        }
        if let Some(v) = patch.cooldown_ms {
            current.cooldown_ms = v;
        }
        if let Some(v) = patch.safe_mode {
            current.safe_mode = v;
        }
        if let Some(v) = patch.lockdown {
            current.lockdown = v;
        }
        if let Some(v) = patch.max_prompt_len {
            current.max_prompt_len = v;
        }
        current.clone()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    fn entry(&mut self, channel: &ChannelName) -> &mut ChannelSettings {
        self.channels
            .entry(channel.clone())
            .or_insert_with(|| self.defaults.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(raw: &str) -> ChannelName {
        ChannelName::parse(raw).unwrap()
    }

    #[test]
    fn test_defaults_created_on_first_access() {
        let mut store = SettingsStore::new(&TuningConfig::default());
        let s = store.get(&channel("foo"));
        assert!(!s.queue_enabled);
        assert_eq!(s.cooldown_ms, 30_000);
        assert!(s.safe_mode);
        assert!(!s.lockdown);
        assert_eq!(s.max_prompt_len, 220);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_spellings_share_one_entry() {
        let mut store = SettingsStore::new(&TuningConfig::default());
        store.set(
            &channel("#Foo"),
            SettingsPatch {
                lockdown: Some(true),
                ..Default::default()
            },
        );
        assert!(store.get(&channel("FOO")).lockdown);
        assert!(store.get(&channel("foo")).lockdown);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_patch_merges() {
        let mut store = SettingsStore::new(&TuningConfig::default());
        let ch = channel("foo");
        store.set(
            &ch,
            SettingsPatch {
                queue_enabled: Some(true),
                ..Default::default()
            },
        );
        let next = store.set(
            &ch,
            SettingsPatch {
                cooldown_ms: Some(5_000),
                ..Default::default()
            },
        );
        assert!(next.queue_enabled);
        assert_eq!(next.cooldown_ms, 5_000);
        assert!(next.safe_mode);
    }

    #[test]
    fn test_flags_serialize_camel_case() {
        let mut store = SettingsStore::new(&TuningConfig::default());
        let json = serde_json::to_value(store.get(&channel("foo"))).unwrap();
        assert_eq!(json["queueEnabled"], false);
        assert_eq!(json["cooldownMs"], 30_000);
        assert_eq!(json["safeMode"], true);
        assert_eq!(json["maxPromptLen"], 220);
    }
}
