//! # Domain Traits
//!
//! Abstract interfaces for the two external collaborators: the chat transport
//! and the HTTP backend. Infrastructure implements them; tests fake them.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::application::settings::ChannelSettings;
use crate::domain::errors::{ApiError, TransportError};
use crate::domain::types::ChannelName;

/// Abstract interface for a chat connection (e.g., Twitch IRC).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain chat message to a channel.
    async fn say(&self, channel: &ChannelName, text: &str) -> Result<(), TransportError>;

    /// Join a channel, resolving once the server confirms membership.
    async fn join(&self, channel: &ChannelName) -> Result<(), TransportError>;

    /// Leave a channel.
    async fn part(&self, channel: &ChannelName) -> Result<(), TransportError>;
}

/// Body of an HTTP reply. Anything that is not valid JSON is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Raw(String),
}

impl ReplyBody {
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text)
            .map(Self::Json)
            .unwrap_or_else(|_| Self::Raw(text.to_string()))
    }

    /// A non-empty string field of a JSON object body.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        match self {
            Self::Json(v) => v.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()),
            Self::Raw(_) => None,
        }
    }

    /// A JSON field interpreted with JavaScript-style truthiness.
    pub fn truthy(&self, key: &str) -> bool {
        let Self::Json(v) = self else {
            return false;
        };
        match v.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

/// Status plus body of an HTTP reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: ReplyBody,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookUser {
    pub id: String,
    pub name: String,
}

/// JSON body posted to the command webhook. The token travels in the body.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    pub token: String,
    pub channel: ChannelName,
    pub user: WebhookUser,
    pub text: String,
    pub flags: ChannelSettings,
}

/// Abstract interface for the directory / verify / webhook backend.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Poll the directory for the channels the bot should be in.
    async fn fetch_channels(&self) -> Result<ApiReply, ApiError>;

    /// Submit a channel verification code.
    async fn verify(&self, channel: &ChannelName, code: &str) -> Result<ApiReply, ApiError>;

    /// Forward a generation command to the webhook.
    async fn send_command(&self, request: &CommandRequest) -> Result<ApiReply, ApiError>;
}
