//! # Channel Membership
//!
//! Keeps the joined channel set in line with the directory service. A polling task
//! reconciles the wanted set (queueing joins, parting unwanted channels right away)
//! and a separate drain task performs one queued join per tick so we stay under the
//! chat server's join throttle. Failed joins are re-queued after a delay that is
//! longer when the failure was a rate-limit rejection.
//!
//! This is eventually consistent: transient failures heal on the next poll or retry.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::application::utils::say_or_log;
use crate::domain::config::TuningConfig;
use crate::domain::errors::{ApiError, TransportError};
use crate::domain::traits::{ApiReply, ChatTransport, RelayApi, ReplyBody};
use crate::domain::types::ChannelName;
use crate::strings::messages;

/// The two directory response layouts we understand.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirectoryListing {
    Logins {
        #[serde(rename = "channelLogins")]
        channel_logins: Vec<Value>,
    },
    Rows {
        channels: Vec<Value>,
    },
}

/// Decode the directory reply into normalized channel names.
pub fn decode_wanted(reply: &ApiReply) -> Result<HashSet<ChannelName>, ApiError> {
    if !reply.is_success() {
        return Err(ApiError::Status(reply.status));
    }
    let ReplyBody::Json(value) = &reply.body else {
        return Err(ApiError::UnrecognizedShape);
    };
    let listing: DirectoryListing =
        serde_json::from_value(value.clone()).map_err(|_| ApiError::UnrecognizedShape)?;

    // Rows without a usable string login are skipped, not fatal.
    let wanted = match listing {
        DirectoryListing::Logins { channel_logins } => channel_logins
            .iter()
            .filter_map(Value::as_str)
            .filter_map(ChannelName::parse)
            .collect(),
        DirectoryListing::Rows { channels } => channels
            .iter()
            .filter_map(|row| row.get("channel_login").and_then(Value::as_str))
            .filter_map(ChannelName::parse)
            .collect(),
    };
    Ok(wanted)
}

/// Joined channels, pending joins, and the per-boot welcome set.
///
/// A channel is in at most one of `joined`, `queue`, or `joining`.
#[derive(Debug, Default)]
pub struct Membership {
    joined: HashSet<ChannelName>,
    queue: VecDeque<ChannelName>,
    joining: HashSet<ChannelName>,
    announced: HashSet<ChannelName>,
}

impl Membership {
    /// Queue a join unless the channel is already joined or pending.
    pub fn queue_join(&mut self, channel: ChannelName) -> bool {
        if self.joined.contains(&channel)
            || self.joining.contains(&channel)
            || self.queue.contains(&channel)
        {
            return false;
        }
        self.queue.push_back(channel);
        true
    }

    /// Queue joins for newly wanted channels and return the joined channels to leave.
    pub fn reconcile(&mut self, wanted: &HashSet<ChannelName>) -> Vec<ChannelName> {
        let mut sorted: Vec<&ChannelName> = wanted.iter().collect();
        sorted.sort();
        for channel in sorted {
            self.queue_join(channel.clone());
        }
        let mut unwanted: Vec<ChannelName> = self
            .joined
            .iter()
            .filter(|c| !wanted.contains(*c))
            .cloned()
            .collect();
        unwanted.sort();
        unwanted
    }

    fn begin_join(&mut self) -> Option<ChannelName> {
        let channel = self.queue.pop_front()?;
        self.joining.insert(channel.clone());
        Some(channel)
    }

    /// Record a join result; returns `true` when the welcome message is still owed.
    fn finish_join(&mut self, channel: &ChannelName, ok: bool) -> bool {
        self.joining.remove(channel);
        if !ok {
            return false;
        }
        self.joined.insert(channel.clone());
        self.announced.insert(channel.clone())
    }

    fn mark_parted(&mut self, channel: &ChannelName) {
        self.joined.remove(channel);
    }

    pub fn is_joined(&self, channel: &ChannelName) -> bool {
        self.joined.contains(channel)
    }

    pub fn is_queued(&self, channel: &ChannelName) -> bool {
        self.queue.contains(channel)
    }

    pub fn joined_count(&self) -> usize {
        self.joined.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }
}

/// Wakes the polling task for an out-of-band sync.
#[derive(Clone, Default)]
pub struct SyncTrigger(Arc<Notify>);

impl SyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.notify_one();
    }

    pub(crate) async fn notified(&self) {
        self.0.notified().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub wanted: usize,
    pub parted: Vec<ChannelName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { announced: bool },
    Retrying { channel: ChannelName, delay: Duration },
}

pub struct ChannelSynchronizer {
    membership: Arc<Mutex<Membership>>,
    chat: Arc<dyn ChatTransport>,
    api: Arc<dyn RelayApi>,
    trigger: SyncTrigger,
    dashboard_url: String,
    join_retry: Duration,
    rate_limit_retry: Duration,
}

impl ChannelSynchronizer {
    pub fn new(
        chat: Arc<dyn ChatTransport>,
        api: Arc<dyn RelayApi>,
        trigger: SyncTrigger,
        dashboard_url: String,
        tuning: &TuningConfig,
    ) -> Self {
        Self {
            membership: Arc::new(Mutex::new(Membership::default())),
            chat,
            api,
            trigger,
            dashboard_url,
            join_retry: Duration::from_millis(tuning.join_retry_ms),
            rate_limit_retry: Duration::from_millis(tuning.join_rate_limit_retry_ms),
        }
    }

    pub fn membership(&self) -> &Arc<Mutex<Membership>> {
        &self.membership
    }

    /// One reconciliation pass against the directory.
    pub async fn sync_channels(&self) -> Result<SyncReport, ApiError> {
        let reply = self.api.fetch_channels().await?;
        let wanted = decode_wanted(&reply)?;

        let unwanted = self.membership.lock().await.reconcile(&wanted);

        let mut parted = Vec::new();
        for channel in unwanted {
            match self.chat.part(&channel).await {
                Ok(()) => {
                    self.membership.lock().await.mark_parted(&channel);
                    tracing::info!(channel = %channel, "left channel");
                    parted.push(channel);
                }
                Err(e) => {
                    tracing::error!(channel = %channel, error = %e, "part failed");
                }
            }
        }

        let (joined, queued) = {
            let m = self.membership.lock().await;
            (m.joined_count(), m.queued_count())
        };
        tracing::info!(wanted = wanted.len(), joined, queued, "sync complete");

        Ok(SyncReport {
            wanted: wanted.len(),
            parted,
        })
    }

    /// Pop one queued join and attempt it. Returns `None` when nothing is queued.
    pub async fn drain_one(&self) -> Option<JoinOutcome> {
        let channel = self.membership.lock().await.begin_join()?;

        match self.chat.join(&channel).await {
            Ok(()) => {
                let announce = self.membership.lock().await.finish_join(&channel, true);
                tracing::info!(channel = %channel, "joined channel");
                if announce {
                    say_or_log(
                        self.chat.as_ref(),
                        &channel,
                        &messages::welcome(&self.dashboard_url),
                    )
                    .await;
                }
                Some(JoinOutcome::Joined {
                    announced: announce,
                })
            }
            Err(e) => {
                self.membership.lock().await.finish_join(&channel, false);
                let delay = self.retry_delay(&e);
                tracing::error!(
                    channel = %channel,
                    error = %e,
                    retry_ms = delay.as_millis() as u64,
                    "join failed"
                );
                self.schedule_retry(channel.clone(), delay);
                Some(JoinOutcome::Retrying { channel, delay })
            }
        }
    }

    fn retry_delay(&self, error: &TransportError) -> Duration {
        if error.is_rate_limited() {
            self.rate_limit_retry
        } else {
            self.join_retry
        }
    }

    fn schedule_retry(&self, channel: ChannelName, delay: Duration) {
        let membership = self.membership.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            membership.lock().await.queue_join(channel);
        });
    }

    /// Poll the directory every `interval`, or sooner when triggered.
    pub async fn run_polling(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.trigger.notified() => {
                    tracing::debug!("out-of-band sync requested");
                }
            }
            if let Err(e) = self.sync_channels().await {
                tracing::error!(error = %e, "channel sync failed");
            }
        }
    }

    /// Drain the join queue, one channel per tick.
    pub async fn run_join_queue(self: Arc<Self>, delay: Duration) {
        let mut ticker = tokio::time::interval(delay);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.drain_one().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{DASHBOARD, Harness, channel, reply};
    use serde_json::json;

    fn set(names: &[&str]) -> HashSet<ChannelName> {
        names.iter().map(|n| channel(n)).collect()
    }

    fn tuning() -> TuningConfig {
        TuningConfig::default()
    }

    #[test]
    fn test_decode_logins() {
        let r = reply(200, json!({ "channelLogins": ["#Alpha", "beta", ""] })).unwrap();
        assert_eq!(decode_wanted(&r).unwrap(), set(&["alpha", "beta"]));
    }

    #[test]
    fn test_decode_rows() {
        let r = reply(
            200,
            json!({ "channels": [
                { "channel_login": "Gamma", "status": "enabled" },
                { "channel_login": null },
                { "other": 1 }
            ] }),
        )
        .unwrap();
        assert_eq!(decode_wanted(&r).unwrap(), set(&["gamma"]));
    }

    #[test]
    fn test_decode_skips_malformed_rows() {
        let r = reply(
            200,
            json!({ "channels": [
                { "channel_login": 42 },
                "not-a-row",
                { "channel_login": ["x"] },
                { "channel_login": "Delta" }
            ] }),
        )
        .unwrap();
        assert_eq!(decode_wanted(&r).unwrap(), set(&["delta"]));

        let r = reply(200, json!({ "channelLogins": ["eps", 7, null] })).unwrap();
        assert_eq!(decode_wanted(&r).unwrap(), set(&["eps"]));
    }

    #[test]
    fn test_decode_rejects_unknown_shape() {
        let r = reply(200, json!({ "items": ["a"] })).unwrap();
        assert!(matches!(decode_wanted(&r), Err(ApiError::UnrecognizedShape)));

        let raw = ApiReply {
            status: 200,
            body: ReplyBody::Raw("not json".into()),
        };
        assert!(matches!(decode_wanted(&raw), Err(ApiError::UnrecognizedShape)));

        let err = reply(500, json!({ "channelLogins": ["a"] })).unwrap();
        assert!(matches!(decode_wanted(&err), Err(ApiError::Status(500))));
    }

    #[test]
    fn test_queue_join_dedups() {
        let mut m = Membership::default();
        assert!(m.queue_join(channel("a")));
        assert!(!m.queue_join(channel("#A")));
        let c = m.begin_join().unwrap();
        // In flight counts as pending.
        assert!(!m.queue_join(channel("a")));
        assert!(m.finish_join(&c, true));
        assert!(!m.queue_join(channel("a")));
        assert!(m.is_joined(&channel("a")));
        assert!(!m.is_queued(&channel("a")));
    }

    #[tokio::test]
    async fn test_sync_joins_new_parts_stale() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        {
            let mut m = sync.membership().lock().await;
            for name in ["b", "c"] {
                m.queue_join(channel(name));
                let c = m.begin_join().unwrap();
                m.finish_join(&c, true);
            }
        }
        h.api
            .push_channels(reply(200, json!({ "channelLogins": ["A", "b"] })));

        let report = sync.sync_channels().await.unwrap();
        assert_eq!(report.wanted, 2);
        assert_eq!(report.parted, vec![channel("c")]);
        assert_eq!(*h.chat.parts.lock().unwrap(), vec!["c".to_string()]);

        let m = sync.membership().lock().await;
        assert!(m.is_queued(&channel("a")));
        assert!(m.is_joined(&channel("b")));
        assert!(!m.is_queued(&channel("b")));
        assert!(!m.is_joined(&channel("c")));
    }

    #[tokio::test]
    async fn test_unrecognized_directory_parts_nothing() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        {
            let mut m = sync.membership().lock().await;
            m.queue_join(channel("b"));
            let c = m.begin_join().unwrap();
            m.finish_join(&c, true);
        }
        h.api.push_channels(reply(200, json!({ "unexpected": true })));

        assert!(sync.sync_channels().await.is_err());
        assert!(h.chat.parts.lock().unwrap().is_empty());
        assert!(sync.membership().lock().await.is_joined(&channel("b")));
    }

    #[tokio::test]
    async fn test_drain_joins_and_welcomes_once() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        sync.membership().lock().await.queue_join(channel("a"));

        assert_eq!(
            sync.drain_one().await,
            Some(JoinOutcome::Joined { announced: true })
        );
        assert_eq!(
            h.chat.said(),
            vec![("a".to_string(), format!("CuhzBot online. Manage settings: {DASHBOARD}"))]
        );
        assert_eq!(sync.drain_one().await, None);

        // Leaving and coming back does not repeat the welcome within one boot.
        sync.membership().lock().await.mark_parted(&channel("a"));
        sync.membership().lock().await.queue_join(channel("a"));
        assert_eq!(
            sync.drain_one().await,
            Some(JoinOutcome::Joined { announced: false })
        );
        assert_eq!(h.chat.said().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_join_waits_longer() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        h.chat.fail_next_join("a", TransportError::RateLimited("msg_ratelimit".into()));
        h.chat.fail_next_join("b", TransportError::Rejected("msg_channel_suspended".into()));
        {
            let mut m = sync.membership().lock().await;
            m.queue_join(channel("a"));
            m.queue_join(channel("b"));
        }

        let Some(JoinOutcome::Retrying { delay: slow, .. }) = sync.drain_one().await else {
            panic!("expected retry for a");
        };
        let Some(JoinOutcome::Retrying { delay: fast, .. }) = sync.drain_one().await else {
            panic!("expected retry for b");
        };
        assert_eq!(slow, Duration::from_millis(15_000));
        assert_eq!(fast, Duration::from_millis(5_000));
        assert!(slow > fast);
    }

    #[tokio::test]
    async fn test_timeout_in_rate_named_channel_uses_short_retry() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        h.chat
            .fail_next_join("strategygamer", TransportError::Timeout("#strategygamer".into()));
        sync.membership().lock().await.queue_join(channel("strategygamer"));

        let Some(JoinOutcome::Retrying { delay, .. }) = sync.drain_one().await else {
            panic!("expected retry for strategygamer");
        };
        assert_eq!(delay, Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_join_requeued_after_delay() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        h.chat.fail_next_join("a", TransportError::Timeout("#a".into()));
        sync.membership().lock().await.queue_join(channel("a"));

        sync.drain_one().await;
        assert!(!sync.membership().lock().await.is_queued(&channel("a")));

        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert!(sync.membership().lock().await.is_queued(&channel("a")));

        assert_eq!(
            sync.drain_one().await,
            Some(JoinOutcome::Joined { announced: true })
        );
    }

    #[tokio::test]
    async fn test_trigger_wakes_polling() {
        let h = Harness::new();
        let sync = h.synchronizer(&tuning());
        let task = tokio::spawn(sync.clone().run_polling(Duration::from_secs(3600)));

        // First tick fires immediately; the trigger causes a second pass.
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.trigger.request();
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        assert_eq!(*h.api.channel_calls.lock().unwrap(), 2);
    }
}
