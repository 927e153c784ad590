use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One event tag: a non-empty list of strings whose first element is the tag name.
pub type Tag = Vec<String>;

/// Event fields chosen by the author, before id/pubkey/signature are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub created_at: u64,
    pub kind: u64,
    pub tags: Vec<Tag>,
    pub content: String,
}

/// Signed, content-addressed event as it travels on the wire.
///
/// `id`, `pubkey` and `sig` are lowercase hex. Values are produced once by a
/// signer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u64,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    /// Returns the author-chosen portion of the event.
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }
}

/// Validated relay address (`ws://` or `wss://` with a non-empty host).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RelayUrl(String);

impl RelayUrl {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let rest = if let Some(rest) = trimmed.strip_prefix("wss://") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("ws://") {
            rest
        } else {
            return Err(ValidationError::InvalidRelayUrl {
                url: input.to_string(),
                reason: "scheme must be ws:// or wss://",
            });
        };
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ValidationError::InvalidRelayUrl {
                url: input.to_string(),
                reason: "missing host",
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidRelayUrl {
                url: input.to_string(),
                reason: "must not contain whitespace",
            });
        }
        // `wss://host/` and `wss://host` address the same relay.
        let normalized = if rest.len() == host.len() + 1 && rest.ends_with('/') {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        Ok(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_secure(&self) -> bool {
        self.0.starts_with("wss://")
    }
}

impl fmt::Display for RelayUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelayUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RelayUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RelayUrl::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Removes repeated relays, keeping the first occurrence of each.
pub fn dedup_relays<'a>(relays: impl IntoIterator<Item = &'a RelayUrl>) -> Vec<RelayUrl> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for relay in relays {
        if seen.insert(relay) {
            out.push(relay.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{dedup_relays, RelayUrl, SignedEvent};

    #[test]
    fn relay_url_accepts_ws_and_wss() {
        let secure = RelayUrl::parse("wss://relay.damus.io").expect("wss parses");
        let plain = RelayUrl::parse(" ws://127.0.0.1:7777/path ").expect("ws parses");
        assert!(secure.is_secure());
        assert!(!plain.is_secure());
        assert_eq!(plain.as_str(), "ws://127.0.0.1:7777/path");
    }

    #[test]
    fn relay_url_rejects_bad_scheme_and_missing_host() {
        assert!(RelayUrl::parse("https://relay.damus.io").is_err());
        assert!(RelayUrl::parse("relay.damus.io").is_err());
        assert!(RelayUrl::parse("wss://").is_err());
        assert!(RelayUrl::parse("wss:///path").is_err());
        assert!(RelayUrl::parse("wss://bad host").is_err());
    }

    #[test]
    fn relay_url_drops_bare_trailing_slash() {
        let a = RelayUrl::parse("wss://nos.lol/").expect("parses");
        let b = RelayUrl::parse("wss://nos.lol").expect("parses");
        assert_eq!(a, b);
        let c = RelayUrl::parse("wss://nos.lol/inbox/").expect("parses");
        assert_eq!(c.as_str(), "wss://nos.lol/inbox/");
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let relays: Vec<RelayUrl> = ["wss://b", "wss://a", "wss://b/", "wss://c", "wss://a"]
            .iter()
            .map(|r| RelayUrl::parse(r).expect("valid"))
            .collect();
        let deduped = dedup_relays(&relays);
        let names: Vec<&str> = deduped.iter().map(RelayUrl::as_str).collect();
        assert_eq!(names, vec!["wss://b", "wss://a", "wss://c"]);
    }

    #[test]
    fn relay_url_deserialize_validates() {
        let ok: RelayUrl = serde_json::from_str("\"wss://nos.lol\"").expect("valid url");
        assert_eq!(ok.as_str(), "wss://nos.lol");
        assert!(serde_json::from_str::<RelayUrl>("\"ftp://nos.lol\"").is_err());
    }

    #[test]
    fn signed_event_uses_wire_field_names() {
        let event = SignedEvent {
            id: "aa".to_string(),
            pubkey: "bb".to_string(),
            created_at: 1_700_000_000,
            kind: 1,
            tags: vec![vec!["t".to_string(), "test".to_string()]],
            content: "hello".to_string(),
            sig: "cc".to_string(),
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["created_at"], 1_700_000_000_u64);
        assert_eq!(value["tags"][0][1], "test");
        assert_eq!(event.unsigned().content, "hello");
    }
}
