//! # Command Handlers
//!
//! Contains specific handler functions for each supported command family.
//! These handlers are invoked by the Router after classification and permission checks.

pub mod admin;
pub mod generate;
pub mod help;
pub mod verify;
