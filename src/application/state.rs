//! # Relay State
//!
//! Bundles the in-memory stores (`RelayState`) that the dispatcher and forwarder share.
//! Passed around explicitly as an `Arc<Mutex<_>>` so independent instances never
//! see each other's channels. Nothing here is persisted; a restart starts clean.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::cooldown::CooldownTracker;
use crate::application::promo::PromoThrottle;
use crate::application::queue::CommandQueue;
use crate::application::settings::SettingsStore;
use crate::domain::config::TuningConfig;

/// Longest cooldown a mod can configure, in seconds.
pub const MAX_COOLDOWN_SECS: u64 = 600;
/// Shortest cooldown a mod can configure, in seconds.
pub const MIN_COOLDOWN_SECS: u64 = 5;

pub struct RelayState {
    pub settings: SettingsStore,
    pub cooldowns: CooldownTracker,
    pub queues: CommandQueue,
    pub promo: PromoThrottle,
}

pub type SharedState = Arc<Mutex<RelayState>>;

impl RelayState {
    pub fn new(tuning: &TuningConfig) -> Self {
        Self {
            settings: SettingsStore::new(tuning),
            cooldowns: CooldownTracker::new(),
            queues: CommandQueue::new(),
            promo: PromoThrottle::new(tuning.promo_interval_ms),
        }
    }

    pub fn shared(tuning: &TuningConfig) -> SharedState {
        Arc::new(Mutex::new(Self::new(tuning)))
    }

    /// Evict cooldown anchors that can no longer block anyone.
    ///
    /// The default cooldown may exceed the mod-settable maximum, so the larger wins.
    pub fn sweep_cooldowns(&mut self, now: i64, default_cooldown_ms: u64) -> usize {
        let max_age = (MAX_COOLDOWN_SECS * 1000).max(default_cooldown_ms);
        self.cooldowns.sweep(now, max_age)
    }
}

/// Periodically drop expired cooldown anchors.
pub async fn run_cooldown_sweep(state: SharedState, interval: Duration, default_cooldown_ms: u64) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; there is nothing to sweep yet.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = state.lock().await.sweep_cooldowns(now_ms(), default_cooldown_ms);
        if removed > 0 {
            tracing::debug!(removed, "swept expired cooldowns");
        }
    }
}

/// Wall-clock milliseconds used for every timestamp in the stores.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ChannelName;

    #[test]
    fn test_sweep_respects_large_default_cooldown() {
        let mut state = RelayState::new(&TuningConfig::default());
        let ch = ChannelName::parse("foo").unwrap();
        state.cooldowns.check_and_consume(&ch, "u1", 900_000, 0);

        // Older than 600s, but the default cooldown is 900s.
        assert_eq!(state.sweep_cooldowns(700_000, 900_000), 0);
        assert_eq!(state.sweep_cooldowns(900_000, 900_000), 1);
    }
}
