//! # Domain Types
//!
//! Common data structures used across the relay: normalized channel names,
//! the identity of whoever sent a chat line, and the chat line itself.

use serde::Serialize;
use std::fmt;

/// A chat channel login, always lowercase and without the leading `#`.
///
/// Every store in the relay is keyed by this type, so two spellings that differ
/// only in case or marker can never create two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Normalizes a raw channel spelling. Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().to_lowercase();
        let name = trimmed.strip_prefix('#').unwrap_or(&trimmed);
        if name.is_empty() {
            None
        } else {
            Some(Self(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The IRC form of the channel (`#login`).
    pub fn irc(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The chat participant who issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invoker {
    pub id: String,
    pub name: String,
    pub is_broadcaster: bool,
    pub is_moderator: bool,
}

impl Invoker {
    /// Broadcasters are always privileged, even without an explicit moderator flag.
    pub fn is_mod(&self) -> bool {
        self.is_broadcaster || self.is_moderator
    }

    /// Prefix used when addressing the invoker in chat.
    pub fn mention(&self) -> String {
        format!("@{}", self.name)
    }
}

/// A single incoming chat line.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel: ChannelName,
    pub sender: Invoker,
    pub text: String,
}
