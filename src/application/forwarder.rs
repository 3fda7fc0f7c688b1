//! # Generation Forwarder
//!
//! Sends a recognized generation command to the external webhook together with the
//! channel's current settings, interprets the reply contract, and relays the result
//! back to chat. Successful generations may trigger the dashboard promotion.

use std::sync::Arc;

use crate::application::state::{SharedState, now_ms};
use crate::application::utils::say_or_log;
use crate::domain::config::Secret;
use crate::domain::traits::{ApiReply, ChatTransport, CommandRequest, RelayApi, WebhookUser};
use crate::domain::types::{ChannelName, Invoker};
use crate::strings::messages;

/// How a webhook reply maps onto chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Reply text, already joined with the optional resource link.
    Handled(String),
    DailyLimit,
    Failed(String),
}

impl WebhookOutcome {
    pub fn interpret(reply: &ApiReply) -> Self {
        if reply.is_success() && reply.body.truthy("handled") {
            let text = reply.body.str_field("reply").unwrap_or(messages::DEFAULT_REPLY);
            return match reply.body.str_field("imageUrl") {
                Some(url) => Self::Handled(format!("{text} {url}")),
                None => Self::Handled(text.to_string()),
            };
        }
        if reply.status == 429 {
            return Self::DailyLimit;
        }
        let error = reply
            .body
            .str_field("error")
            .or_else(|| reply.body.str_field("message"))
            .map(str::to_string)
            .unwrap_or_else(|| messages::command_failed(reply.status));
        Self::Failed(error)
    }
}

pub struct GenerationForwarder {
    api: Arc<dyn RelayApi>,
    chat: Arc<dyn ChatTransport>,
    state: SharedState,
    webhook_token: Secret,
    dashboard_url: String,
}

impl GenerationForwarder {
    pub fn new(
        api: Arc<dyn RelayApi>,
        chat: Arc<dyn ChatTransport>,
        state: SharedState,
        webhook_token: Secret,
        dashboard_url: String,
    ) -> Self {
        Self {
            api,
            chat,
            state,
            webhook_token,
            dashboard_url,
        }
    }

    /// Forward one command and emit the reply. Never fails; every outcome becomes chat.
    pub async fn forward(&self, channel: &ChannelName, invoker: &Invoker, text: &str) {
        let flags = self.state.lock().await.settings.get(channel);
        let request = CommandRequest {
            token: self.webhook_token.expose().to_string(),
            channel: channel.clone(),
            user: WebhookUser {
                id: invoker.id.clone(),
                name: invoker.name.clone(),
            },
            text: text.to_string(),
            flags,
        };

        let outcome = match self.api.send_command(&request).await {
            Ok(reply) => WebhookOutcome::interpret(&reply),
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "command webhook unreachable");
                WebhookOutcome::Failed(messages::COMMAND_UNREACHABLE.to_string())
            }
        };
        tracing::debug!(channel = %channel, user = %invoker.name, ?outcome, "webhook outcome");

        let reply = match &outcome {
            WebhookOutcome::Handled(text) | WebhookOutcome::Failed(text) => text.as_str(),
            WebhookOutcome::DailyLimit => messages::DAILY_LIMIT,
        };
        say_or_log(
            self.chat.as_ref(),
            channel,
            &messages::addressed(invoker, reply),
        )
        .await;

        if matches!(outcome, WebhookOutcome::Handled(_)) {
            self.maybe_announce(channel).await;
        }
    }

    /// Post the dashboard link unless one went out recently in this channel.
    pub async fn maybe_announce(&self, channel: &ChannelName) {
        let due = self.state.lock().await.promo.try_claim(channel, now_ms());
        if due {
            say_or_log(
                self.chat.as_ref(),
                channel,
                &messages::promo(&self.dashboard_url),
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Harness, channel, reply, viewer, DASHBOARD};
    use crate::domain::errors::ApiError;
    use crate::domain::traits::ReplyBody;
    use serde_json::json;

    fn api_reply(status: u16, body: serde_json::Value) -> ApiReply {
        ApiReply {
            status,
            body: ReplyBody::Json(body),
        }
    }

    #[test]
    fn test_interpret_handled_with_image() {
        let outcome = WebhookOutcome::interpret(&api_reply(
            200,
            json!({ "handled": true, "reply": "ok", "imageUrl": "http://x" }),
        ));
        assert_eq!(outcome, WebhookOutcome::Handled("ok http://x".into()));
    }

    #[test]
    fn test_interpret_handled_without_reply() {
        let outcome = WebhookOutcome::interpret(&api_reply(200, json!({ "handled": true })));
        assert_eq!(outcome, WebhookOutcome::Handled("Done.".into()));
    }

    #[test]
    fn test_interpret_429_ignores_body() {
        let outcome = WebhookOutcome::interpret(&api_reply(
            429,
            json!({ "handled": true, "error": "slow down" }),
        ));
        assert_eq!(outcome, WebhookOutcome::DailyLimit);
    }

    #[test]
    fn test_interpret_failures() {
        let outcome = WebhookOutcome::interpret(&api_reply(
            400,
            json!({ "error": "bad prompt", "message": "ignored" }),
        ));
        assert_eq!(outcome, WebhookOutcome::Failed("bad prompt".into()));

        let outcome = WebhookOutcome::interpret(&api_reply(200, json!({ "handled": false, "message": "nope" })));
        assert_eq!(outcome, WebhookOutcome::Failed("nope".into()));

        let outcome = WebhookOutcome::interpret(&ApiReply {
            status: 502,
            body: ReplyBody::Raw("<html>".into()),
        });
        assert_eq!(outcome, WebhookOutcome::Failed("Command failed (502).".into()));
    }

    #[tokio::test]
    async fn test_forward_sends_settings_and_replies() {
        let h = Harness::new();
        h.api.push_command(reply(
            200,
            json!({ "handled": true, "reply": "ok", "imageUrl": "http://x" }),
        ));

        h.forwarder
            .forward(&channel("#Foo"), &viewer("user"), "!chain a cat")
            .await;

        let calls = h.api.command_calls();
        assert_eq!(calls.len(), 1);
        let body = serde_json::to_value(&calls[0]).unwrap();
        assert_eq!(body["token"], "hook-token");
        assert_eq!(body["channel"], "foo");
        assert_eq!(body["user"]["id"], "id-user");
        assert_eq!(body["user"]["name"], "user");
        assert_eq!(body["text"], "!chain a cat");
        assert_eq!(body["flags"]["safeMode"], true);

        assert_eq!(
            h.chat.texts(),
            vec![
                "@user ok http://x".to_string(),
                format!("Manage CuhzBot: {DASHBOARD}"),
            ]
        );
    }

    #[tokio::test]
    async fn test_promo_throttled_after_first() {
        let h = Harness::new();
        let ch = channel("foo");
        h.forwarder.forward(&ch, &viewer("a"), "!chain one").await;
        h.forwarder.forward(&ch, &viewer("b"), "!chain two").await;

        let promos = h
            .chat
            .texts()
            .into_iter()
            .filter(|t| t.starts_with("Manage CuhzBot"))
            .count();
        assert_eq!(promos, 1);
    }

    #[tokio::test]
    async fn test_daily_limit_has_no_promo() {
        let h = Harness::new();
        h.api.push_command(reply(429, json!({ "handled": true, "reply": "ignored" })));
        h.forwarder
            .forward(&channel("foo"), &viewer("user"), "!chain x")
            .await;
        assert_eq!(h.chat.texts(), vec!["@user Daily limit reached.".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_reports_failure() {
        let h = Harness::new();
        h.api
            .push_command(Err(ApiError::Network("connection refused".into())));
        h.forwarder
            .forward(&channel("foo"), &viewer("user"), "!chain x")
            .await;
        assert_eq!(
            h.chat.texts(),
            vec!["@user Command failed (service unreachable).".to_string()]
        );
    }
}
