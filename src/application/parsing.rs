//! # Command Grammar
//!
//! Classifies a chat line against the relay's command grammar. Matching is
//! case-insensitive on the command tokens; arguments keep their original case.
//! Lines that are not commands yield `None` and are ignored by the router.

use crate::application::state::{MAX_COOLDOWN_SECS, MIN_COOLDOWN_SECS};

pub const ADMIN_PREFIX: &str = "!cuhz";
pub const CHAIN_PREFIX: &str = "!chain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.map(str::to_lowercase).as_deref() {
            Some("on") => Some(Self::On),
            Some("off") => Some(Self::Off),
            _ => None,
        }
    }

    pub fn enabled(self) -> bool {
        self == Self::On
    }
}

/// A recognized command. `None` arguments mean the argument was missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Verify { code: Option<String> },
    Status,
    Queue(Option<Toggle>),
    Next,
    /// Seconds, already clamped to the allowed range.
    Cooldown(Option<u64>),
    Safe(Option<Toggle>),
    Lockdown(Option<Toggle>),
    Generate { prompt: String },
}

impl Command {
    /// Whether the command is restricted to broadcaster/moderators.
    pub fn is_mod_only(&self) -> bool {
        matches!(
            self,
            Self::Status
                | Self::Queue(_)
                | Self::Next
                | Self::Cooldown(_)
                | Self::Safe(_)
                | Self::Lockdown(_)
        )
    }
}

pub fn parse_command(text: &str) -> Option<Command> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let (head, rest) = tokens.split_first()?;
    let head = head.to_lowercase();

    if head == CHAIN_PREFIX {
        return Some(generate(rest));
    }
    if head != ADMIN_PREFIX {
        return None;
    }

    let sub = rest.first().map(|s| s.to_lowercase());
    let arg = rest.get(1).copied();
    let bare = rest.len() == 1;

    let command = match sub.as_deref() {
        Some("help") if bare => Command::Help,
        Some("verify") => Command::Verify {
            code: arg.map(str::to_string),
        },
        Some("status") if bare => Command::Status,
        Some("queue") => Command::Queue(Toggle::parse(arg)),
        Some("next") if bare => Command::Next,
        Some("cooldown") => Command::Cooldown(parse_cooldown_secs(arg)),
        Some("safe") => Command::Safe(Toggle::parse(arg)),
        Some("lockdown") => Command::Lockdown(Toggle::parse(arg)),
        _ => generate(rest),
    };
    Some(command)
}

fn generate(rest: &[&str]) -> Command {
    Command::Generate {
        prompt: rest.join(" "),
    }
}

/// Accepts any finite number, floors it, and clamps it into the allowed range.
fn parse_cooldown_secs(arg: Option<&str>) -> Option<u64> {
    let value: f64 = arg?.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let clamped = value
        .floor()
        .clamp(MIN_COOLDOWN_SECS as f64, MAX_COOLDOWN_SECS as f64);
    Some(clamped as u64)
}
