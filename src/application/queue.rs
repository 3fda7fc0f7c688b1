//! # Command Queue
//!
//! Per-channel FIFO of generation requests held back while queue mode is on.
//! Items are only consumed by an explicit `next` from a mod.

use std::collections::{HashMap, VecDeque};

use crate::domain::types::{ChannelName, Invoker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    pub channel: ChannelName,
    pub invoker: Invoker,
    pub text: String,
    pub enqueued_at: i64,
}

#[derive(Default)]
pub struct CommandQueue {
    channels: HashMap<ChannelName, VecDeque<QueuedCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and return the new length (its 1-based position).
    pub fn enqueue(&mut self, item: QueuedCommand) -> usize {
        let queue = self.channels.entry(item.channel.clone()).or_default();
        queue.push_back(item);
        queue.len()
    }

    pub fn dequeue_one(&mut self, channel: &ChannelName) -> Option<QueuedCommand> {
        self.channels.get_mut(channel)?.pop_front()
    }

    pub fn len(&self, channel: &ChannelName) -> usize {
        self.channels.get(channel).map_or(0, VecDeque::len)
    }
}
