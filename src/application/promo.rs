//! # Promotion Throttle
//!
//! Rate-limits the unsolicited dashboard link posted after successful generations,
//! independently of the per-user command cooldown.

use std::collections::HashMap;

use crate::domain::types::ChannelName;

pub struct PromoThrottle {
    interval_ms: u64,
    last: HashMap<ChannelName, i64>,
}

impl PromoThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last: HashMap::new(),
        }
    }

    /// Returns `true` (and records `now`) when an announcement is due.
    pub fn try_claim(&mut self, channel: &ChannelName, now: i64) -> bool {
        let interval = i64::try_from(self.interval_ms).unwrap_or(i64::MAX);
        if let Some(&last) = self.last.get(channel) {
            if now.saturating_sub(last).max(0) < interval {
                return false;
            }
        }
        self.last.insert(channel.clone(), now);
        true
    }
}
