//! # Domain Layer
//!
//! Core definitions, types, and traits that define the business domain of the relay.
//! Independent of the chat network and HTTP stack, serving as the contract for other layers.

pub mod config;
pub mod errors;
pub mod traits;
pub mod types;
