//! # Strings Module
//!
//! Centralizes user-facing chat replies and help text.

pub mod help;
pub mod messages;
