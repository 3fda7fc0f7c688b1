//! # Errors
//!
//! Error taxonomy for each boundary of the relay. Only `ConfigError` is fatal;
//! everything else is logged or turned into a chat reply by the caller.

use thiserror::Error;

/// Missing or malformed startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failures from the chat transport (join/part/send).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server explicitly throttled us.
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("no response from server for {0}")]
    Timeout(String),

    #[error("not connected")]
    Disconnected,

    /// Server refused the request; carries the `msg-id`.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether a retry should wait for the longer rate-limit delay.
    ///
    /// Prefers the structured variant and falls back to scanning the server's
    /// rejection reason. Channel names never take part in the match.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Rejected(reason) => reason.to_lowercase().contains("rate"),
            Self::Timeout(_) | Self::Disconnected => false,
        }
    }
}

/// Failures reaching the external directory, verify, or webhook endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("unrecognized directory response shape")]
    UnrecognizedShape,
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
