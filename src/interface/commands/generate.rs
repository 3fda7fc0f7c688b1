//! # Generation Command
//!
//! Handles `!chain <prompt>` and `!cuhz <prompt>`: runs admission control and either
//! replies with the rejection, reports the queue position, or forwards the command.

use crate::application::admission::{Admission, admit};
use crate::application::forwarder::GenerationForwarder;
use crate::application::state::{SharedState, now_ms};
use crate::application::utils::say_or_log;
use crate::domain::traits::ChatTransport;
use crate::domain::types::ChatMessage;
use crate::strings::messages;

pub async fn handle_generate(
    state: &SharedState,
    chat: &dyn ChatTransport,
    forwarder: &GenerationForwarder,
    dashboard_url: &str,
    message: &ChatMessage,
    prompt: &str,
) {
    let admission = {
        let mut guard = state.lock().await;
        admit(&mut guard, message, prompt, now_ms())
    };

    let reply = match admission {
        Admission::Run => {
            forwarder
                .forward(&message.channel, &message.sender, message.text.trim())
                .await;
            return;
        }
        Admission::Restricted => messages::RESTRICTED_TO_MODS.to_string(),
        Admission::Usage => messages::generation_usage(dashboard_url),
        Admission::TooLong { limit } => messages::prompt_too_long(limit),
        Admission::CoolingDown { remaining_secs } => messages::cooldown_active(remaining_secs),
        Admission::Queued { position } => {
            tracing::info!(channel = %message.channel, user = %message.sender.name, position, "command queued");
            messages::queued_at(position)
        }
    };
    say_or_log(
        chat,
        &message.channel,
        &messages::addressed(&message.sender, &reply),
    )
    .await;
}
