//! # Application Layer
//!
//! Contains the relay's business logic: command grammar and routing, per-channel
//! settings, admission control (lockdown, cooldowns, queueing), webhook forwarding,
//! and channel membership synchronization.

pub mod admission;
pub mod cooldown;
pub mod forwarder;
pub mod logging;
pub mod membership;
pub mod parsing;
pub mod promo;
pub mod queue;
pub mod router;
pub mod settings;
pub mod state;
pub mod utils;

#[cfg(test)]
pub mod testing;
