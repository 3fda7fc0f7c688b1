//! # Messages
//!
//! Contains constant strings and format functions for user-facing chat replies.

use crate::domain::types::Invoker;

/// Prefix a reply with the invoker's mention.
pub fn addressed(invoker: &Invoker, text: &str) -> String {
    format!("{} {text}", invoker.mention())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

// Verify
pub const VERIFY_USAGE: &str = "Usage: !cuhz verify <CODE>";
pub const VERIFIED: &str = "Verified.";
pub const VERIFY_FAILED: &str = "Verification failed.";

// Mod commands
pub const QUEUE_USAGE: &str = "Usage: !cuhz queue on|off";
pub const SAFE_USAGE: &str = "Usage: !cuhz safe on|off";
pub const LOCKDOWN_USAGE: &str = "Usage: !cuhz lockdown on|off";
pub const COOLDOWN_USAGE: &str = "Usage: !cuhz cooldown <seconds> (5-600)";
pub const QUEUE_EMPTY: &str = "Queue is empty.";

pub fn status(
    queue_enabled: bool,
    cooldown_ms: u64,
    safe_mode: bool,
    lockdown: bool,
    queued: usize,
) -> String {
    let cooldown_secs = cooldown_ms.saturating_add(500) / 1000;
    format!(
        "Status: queue={} cooldown={cooldown_secs}s safe={} lockdown={} queued={queued}",
        on_off(queue_enabled),
        on_off(safe_mode),
        on_off(lockdown),
    )
}

pub fn queue_mode_now(enabled: bool) -> String {
    format!("Queue mode is now {}.", on_off(enabled))
}

pub fn safe_mode_now(enabled: bool) -> String {
    format!("Safe mode is now {}.", on_off(enabled))
}

pub fn lockdown_now(enabled: bool) -> String {
    format!("Lockdown is now {}.", on_off(enabled))
}

pub fn cooldown_set(secs: u64) -> String {
    format!("Cooldown set to {secs}s.")
}

// Generation
pub const RESTRICTED_TO_MODS: &str = "Commands are currently restricted to mods.";
pub const DEFAULT_REPLY: &str = "Done.";
pub const DAILY_LIMIT: &str = "Daily limit reached.";

pub fn generation_usage(dashboard_url: &str) -> String {
    format!("Usage: !chain <prompt> | Dashboard: {dashboard_url}")
}

pub fn prompt_too_long(limit: usize) -> String {
    format!("Prompt too long. Limit is {limit} characters.")
}

pub fn cooldown_active(remaining_secs: u64) -> String {
    format!("Cooldown active. Try again in {remaining_secs}s.")
}

pub fn queued_at(position: usize) -> String {
    format!("Added to queue. Position: {position}.")
}

pub fn command_failed(status: u16) -> String {
    format!("Command failed ({status}).")
}

pub const COMMAND_UNREACHABLE: &str = "Command failed (service unreachable).";

// Announcements
pub fn welcome(dashboard_url: &str) -> String {
    format!("CuhzBot online. Manage settings: {dashboard_url}")
}

pub fn promo(dashboard_url: &str) -> String {
    format!("Manage CuhzBot: {dashboard_url}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rounds_seconds() {
        assert_eq!(
            status(true, 30_000, true, false, 2),
            "Status: queue=on cooldown=30s safe=on lockdown=off queued=2"
        );
        assert_eq!(
            status(false, 5_499, false, true, 0),
            "Status: queue=off cooldown=5s safe=off lockdown=on queued=0"
        );
        assert!(status(false, 5_500, false, false, 0).contains("cooldown=6s"));
    }

    #[test]
    fn test_status_huge_cooldown_does_not_overflow() {
        let expected = format!("cooldown={}s", u64::MAX / 1000);
        assert!(status(false, u64::MAX, false, false, 0).contains(&expected));
    }

    #[test]
    fn test_addressed() {
        let invoker = Invoker {
            name: "viewer".into(),
            ..Default::default()
        };
        assert_eq!(addressed(&invoker, "hi"), "@viewer hi");
    }
}
