//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (`ChatTransport`, `RelayApi`).

pub mod api;
pub mod twitch;
