//! IRCv3 line parsing for the Twitch chat dialect.
//!
//! Only the subset the relay reads is modeled: tags, prefix, command and
//! parameters (with the trailing parameter folded into the list).

use std::collections::HashMap;

use crate::domain::types::Invoker;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse one line (without the trailing CRLF). Returns `None` for empty or
    /// command-less input.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut message = Self::default();

        if let Some(stripped) = rest.strip_prefix('@') {
            let (raw_tags, tail) = stripped.split_once(' ')?;
            message.tags = parse_tags(raw_tags);
            rest = tail.trim_start();
        }

        if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, tail) = stripped.split_once(' ')?;
            message.prefix = Some(prefix.to_string());
            rest = tail.trim_start();
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split(' ').filter(|w| !w.is_empty());
        message.command = words.next()?.to_uppercase();
        message.params = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            message.params.push(trailing.to_string());
        }
        Some(message)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Nickname portion of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split(['!', '@']).next().unwrap_or(prefix);
        (!nick.is_empty()).then_some(nick)
    }

    /// Build the sender identity from the nick and the `user-id`, `badges` and `mod` tags.
    pub fn invoker(&self) -> Invoker {
        let badges = self.tag("badges").map(parse_badges).unwrap_or_default();
        let is_broadcaster = badges.get("broadcaster").is_some_and(|v| v == "1");
        let is_moderator =
            self.tag("mod") == Some("1") || badges.get("moderator").is_some_and(|v| v == "1");

        Invoker {
            id: self.tag("user-id").unwrap_or_default().to_string(),
            name: self.nick().unwrap_or_default().to_lowercase(),
            is_broadcaster,
            is_moderator,
        }
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// `broadcaster/1,subscriber/12` → {"broadcaster": "1", "subscriber": "12"}
fn parse_badges(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|badge| badge.split_once('/'))
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

/// Reverse the IRCv3 tag value escaping.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}
