//! # Mod Commands
//!
//! Handles `status`, `queue`, `next`, `cooldown`, `safe` and `lockdown`.
//! The router has already checked privileges; non-mods never reach these.

use crate::application::forwarder::GenerationForwarder;
use crate::application::parsing::Toggle;
use crate::application::settings::SettingsPatch;
use crate::application::state::{SharedState, now_ms};
use crate::application::utils::say_or_log;
use crate::domain::traits::ChatTransport;
use crate::domain::types::ChatMessage;
use crate::strings::messages;

/// Which boolean channel setting a toggle command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSetting {
    Queue,
    Safe,
    Lockdown,
}

impl ToggleSetting {
    fn usage(self) -> &'static str {
        match self {
            Self::Queue => messages::QUEUE_USAGE,
            Self::Safe => messages::SAFE_USAGE,
            Self::Lockdown => messages::LOCKDOWN_USAGE,
        }
    }

    fn patch(self, enabled: bool) -> SettingsPatch {
        match self {
            Self::Queue => SettingsPatch {
                queue_enabled: Some(enabled),
                ..Default::default()
            },
            Self::Safe => SettingsPatch {
                safe_mode: Some(enabled),
                ..Default::default()
            },
            Self::Lockdown => SettingsPatch {
                lockdown: Some(enabled),
                ..Default::default()
            },
        }
    }
}

pub async fn handle_status(state: &SharedState, chat: &dyn ChatTransport, message: &ChatMessage) {
    let text = {
        let mut guard = state.lock().await;
        let s = guard.settings.get(&message.channel);
        let queued = guard.queues.len(&message.channel);
        messages::status(s.queue_enabled, s.cooldown_ms, s.safe_mode, s.lockdown, queued)
    };
    say_or_log(chat, &message.channel, &text).await;
}

pub async fn handle_toggle(
    state: &SharedState,
    chat: &dyn ChatTransport,
    message: &ChatMessage,
    setting: ToggleSetting,
    toggle: Option<Toggle>,
) {
    let Some(toggle) = toggle else {
        let text = messages::addressed(&message.sender, setting.usage());
        say_or_log(chat, &message.channel, &text).await;
        return;
    };

    let next = state
        .lock()
        .await
        .settings
        .set(&message.channel, setting.patch(toggle.enabled()));
    tracing::info!(channel = %message.channel, by = %message.sender.name, ?setting, ?toggle, "setting changed");

    let text = match setting {
        ToggleSetting::Queue => messages::queue_mode_now(next.queue_enabled),
        ToggleSetting::Safe => messages::safe_mode_now(next.safe_mode),
        ToggleSetting::Lockdown => messages::lockdown_now(next.lockdown),
    };
    say_or_log(chat, &message.channel, &text).await;
}

pub async fn handle_cooldown(
    state: &SharedState,
    chat: &dyn ChatTransport,
    message: &ChatMessage,
    secs: Option<u64>,
) {
    let Some(secs) = secs else {
        let text = messages::addressed(&message.sender, messages::COOLDOWN_USAGE);
        say_or_log(chat, &message.channel, &text).await;
        return;
    };

    state.lock().await.settings.set(
        &message.channel,
        SettingsPatch {
            cooldown_ms: Some(secs * 1000),
            ..Default::default()
        },
    );
    tracing::info!(channel = %message.channel, by = %message.sender.name, secs, "cooldown changed");
    say_or_log(chat, &message.channel, &messages::cooldown_set(secs)).await;
}

/// Run the oldest queued command for this channel, if any.
pub async fn handle_next(
    state: &SharedState,
    chat: &dyn ChatTransport,
    forwarder: &GenerationForwarder,
    message: &ChatMessage,
) {
    let item = state.lock().await.queues.dequeue_one(&message.channel);
    match item {
        Some(item) => {
            tracing::info!(
                channel = %item.channel,
                user = %item.invoker.name,
                waited_ms = now_ms().saturating_sub(item.enqueued_at),
                "running queued command"
            );
            forwarder.forward(&item.channel, &item.invoker, &item.text).await;
        }
        None => say_or_log(chat, &message.channel, messages::QUEUE_EMPTY).await,
    }
}
