//! # Cooldown Tracker
//!
//! Remembers the last accepted command per (channel, user). A successful check
//! consumes the window; a rejected one leaves the anchor untouched.

use std::collections::HashMap;

use crate::domain::types::ChannelName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    pub allowed: bool,
    pub remaining_ms: u64,
}

impl CooldownCheck {
    /// Remaining wait rounded up to whole seconds, as shown in chat.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }
}

#[derive(Default)]
pub struct CooldownTracker {
    last: HashMap<(ChannelName, String), i64>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `now` is wall-clock milliseconds. A clock that stepped backwards counts as
    /// no time elapsed, so the wait never exceeds the window.
    pub fn check_and_consume(
        &mut self,
        channel: &ChannelName,
        user_id: &str,
        window_ms: u64,
        now: i64,
    ) -> CooldownCheck {
        let key = (channel.clone(), user_id.to_string());
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);

        if let Some(&last) = self.last.get(&key) {
            let elapsed = now.saturating_sub(last).max(0);
            if elapsed < window {
                return CooldownCheck {
                    allowed: false,
                    remaining_ms: (window - elapsed).unsigned_abs(),
                };
            }
        }

        self.last.insert(key, now);
        CooldownCheck {
            allowed: true,
            remaining_ms: 0,
        }
    }

    /// Drop entries whose anchor is older than `max_age_ms`. Returns how many were removed.
    pub fn sweep(&mut self, now: i64, max_age_ms: u64) -> usize {
        let max_age = i64::try_from(max_age_ms).unwrap_or(i64::MAX);
        let before = self.last.len();
        self.last
            .retain(|_, last| now.saturating_sub(*last) < max_age);
        before - self.last.len()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }
}
