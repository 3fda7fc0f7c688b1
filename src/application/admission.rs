//! # Admission Control
//!
//! Decides whether a generation command runs now, is queued, or is rejected.
//! The whole decision is taken under one lock of the relay state, so the
//! cooldown anchor and queue position are consistent with each other.

use crate::application::queue::QueuedCommand;
use crate::application::state::RelayState;
use crate::domain::types::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Lockdown is on and the invoker is not a mod.
    Restricted,
    /// Empty prompt or a request for help.
    Usage,
    TooLong { limit: usize },
    CoolingDown { remaining_secs: u64 },
    Queued { position: usize },
    Run,
}

/// Checks run in a fixed order: lockdown, usage, length, cooldown, queue.
pub fn admit(state: &mut RelayState, message: &ChatMessage, prompt: &str, now: i64) -> Admission {
    let settings = state.settings.get(&message.channel);
    let is_mod = message.sender.is_mod();

    if settings.lockdown && !is_mod {
        return Admission::Restricted;
    }

    if prompt.is_empty() || prompt.eq_ignore_ascii_case("help") {
        return Admission::Usage;
    }

    if prompt.chars().count() > settings.max_prompt_len {
        return Admission::TooLong {
            limit: settings.max_prompt_len,
        };
    }

    let check = state.cooldowns.check_and_consume(
        &message.channel,
        &message.sender.id,
        settings.cooldown_ms,
        now,
    );
    if !check.allowed {
        return Admission::CoolingDown {
            remaining_secs: check.remaining_secs(),
        };
    }

    if settings.queue_enabled && !is_mod {
        let position = state.queues.enqueue(QueuedCommand {
            channel: message.channel.clone(),
            invoker: message.sender.clone(),
            text: message.text.trim().to_string(),
            enqueued_at: now,
        });
        return Admission::Queued { position };
    }

    Admission::Run
}
