//! # Twitch Chat
//!
//! IRC-over-WebSocket implementation of `ChatTransport`.

pub mod client;
pub mod irc;

pub use client::TwitchClient;
