//! # Verify Command
//!
//! Handles `!cuhz verify <CODE>`. Open to any chat participant; the backend is the
//! authority on abuse. A successful verification triggers an immediate channel sync.

use crate::application::membership::SyncTrigger;
use crate::application::utils::say_or_log;
use crate::domain::traits::{ChatTransport, RelayApi};
use crate::domain::types::ChatMessage;
use crate::strings::messages;

pub async fn handle_verify(
    api: &dyn RelayApi,
    chat: &dyn ChatTransport,
    trigger: &SyncTrigger,
    message: &ChatMessage,
    code: Option<&str>,
) {
    let Some(code) = code else {
        let text = messages::addressed(&message.sender, messages::VERIFY_USAGE);
        say_or_log(chat, &message.channel, &text).await;
        return;
    };
    let code = code.trim().to_uppercase();

    let reply = match api.verify(&message.channel, &code).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(channel = %message.channel, error = %e, "verify call failed");
            let text = messages::addressed(&message.sender, messages::VERIFY_FAILED);
            say_or_log(chat, &message.channel, &text).await;
            return;
        }
    };

    if reply.is_success() && reply.body.truthy("success") {
        let body = reply.body.str_field("message").unwrap_or(messages::VERIFIED);
        let text = messages::addressed(&message.sender, body);
        say_or_log(chat, &message.channel, &text).await;
        tracing::info!(channel = %message.channel, "channel verified, requesting sync");
        trigger.request();
    } else {
        let body = reply
            .body
            .str_field("message")
            .or_else(|| reply.body.str_field("error"))
            .unwrap_or(messages::VERIFY_FAILED);
        let text = messages::addressed(&message.sender, body);
        say_or_log(chat, &message.channel, &text).await;
    }
}
