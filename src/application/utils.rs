use crate::domain::traits::ChatTransport;
use crate::domain::types::ChannelName;

/// Fire-and-forget chat send. Failures are logged and dropped, never retried:
/// a late reply is worse than a missing one.
pub async fn say_or_log(chat: &dyn ChatTransport, channel: &ChannelName, text: &str) {
    if let Err(e) = chat.say(channel, text).await {
        tracing::warn!(channel = %channel, error = %e, "dropping chat reply");
    }
}
