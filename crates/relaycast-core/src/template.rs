//! Event template files: the JSON documents authors hand to `relaycast`.
//!
//! A template carries the author-chosen event fields (`content`, `kind`,
//! `tags`) plus an optional relay list overriding the defaults.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ValidationError;
use crate::types::{Tag, UnsignedEvent};

/// Event kind used when the template omits `kind` (short text note).
pub const DEFAULT_KIND: u64 = 1;

/// Relays used when the template omits `relays`.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
    "wss://nostr-pub.wellorder.net",
    "wss://relay.current.fyi",
];

/// Parsed and structurally valid event template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTemplate {
    pub kind: u64,
    pub tags: Vec<Tag>,
    pub content: String,
    /// Relay strings exactly as written; `None` means "use the defaults".
    pub relays: Option<Vec<String>>,
}

/// Relay entry that does not use a websocket scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayWarning {
    pub index: usize,
    pub relay: String,
}

/// Human-facing summary printed after a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSummary {
    pub kind: u64,
    /// Unicode scalar values, so an emoji counts once rather than as two
    /// UTF-16 code units.
    pub content_chars: usize,
    pub tags: usize,
    /// `None` when the template relies on the default relay list.
    pub relays: Option<usize>,
    pub warnings: Vec<RelayWarning>,
}

impl EventTemplate {
    /// Reads and validates a template file.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        if !path.exists() {
            return Err(ValidationError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses and validates template JSON.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(object) = value else {
            return Err(ValidationError::NotAnObject);
        };

        let content = match object.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => return Err(ValidationError::InvalidContent),
        };
        let kind = match object.get("kind") {
            None => DEFAULT_KIND,
            Some(value) => parse_kind(value).ok_or(ValidationError::InvalidKind)?,
        };
        let tags = parse_tags(&object)?;
        let relays = parse_relays(&object)?;

        Ok(Self {
            kind,
            tags,
            content,
            relays,
        })
    }

    /// Relay entries lacking a `ws://`/`wss://` prefix.
    pub fn relay_warnings(&self) -> Vec<RelayWarning> {
        let Some(relays) = &self.relays else {
            return Vec::new();
        };
        relays
            .iter()
            .enumerate()
            .filter(|(_, relay)| !relay.starts_with("wss://") && !relay.starts_with("ws://"))
            .map(|(index, relay)| RelayWarning {
                index,
                relay: relay.clone(),
            })
            .collect()
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            kind: self.kind,
            content_chars: self.content.chars().count(),
            tags: self.tags.len(),
            relays: self.relays.as_ref().map(Vec::len),
            warnings: self.relay_warnings(),
        }
    }

    /// Builds the unsigned event stamped with `created_at`.
    pub fn to_unsigned(&self, created_at: u64) -> UnsignedEvent {
        UnsignedEvent {
            created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Relays to publish to: the template's own list, else `defaults`.
    pub fn relay_strings_or(&self, defaults: &[String]) -> Vec<String> {
        match &self.relays {
            Some(relays) => relays.clone(),
            None => defaults.to_vec(),
        }
    }
}

/// Validates a template file and logs a warning per non-websocket relay.
pub fn validate_template_file(path: &Path) -> Result<TemplateSummary, ValidationError> {
    let template = EventTemplate::load(path)?;
    let summary = template.summary();
    for warning in &summary.warnings {
        warn!(
            "relay at index {} should use wss:// or ws:// protocol: {}",
            warning.index, warning.relay
        );
    }
    Ok(summary)
}

fn parse_kind(value: &Value) -> Option<u64> {
    if let Some(kind) = value.as_u64() {
        return Some(kind);
    }
    // `1.0` is an integer as far as JSON authors are concerned.
    let float = value.as_f64()?;
    if float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64 {
        return Some(float as u64);
    }
    None
}

/// Every tag element must be a string, not only the tag name: an event with
/// a numeric tag value cannot be signed into a valid NIP-01 event anyway.
fn parse_tags(object: &Map<String, Value>) -> Result<Vec<Tag>, ValidationError> {
    let Some(raw) = object.get("tags") else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(ValidationError::TagsNotArray);
    };
    let mut tags = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Array(parts) = item else {
            return Err(ValidationError::TagNotArray { index });
        };
        let Some(first) = parts.first() else {
            return Err(ValidationError::EmptyTag { index });
        };
        if !first.is_string() {
            return Err(ValidationError::TagNameNotString { index });
        }
        let mut tag = Vec::with_capacity(parts.len());
        for part in parts {
            let Value::String(part) = part else {
                return Err(ValidationError::TagValueNotString { index });
            };
            tag.push(part.clone());
        }
        tags.push(tag);
    }
    Ok(tags)
}

fn parse_relays(object: &Map<String, Value>) -> Result<Option<Vec<String>>, ValidationError> {
    let Some(raw) = object.get("relays") else {
        return Ok(None);
    };
    let Value::Array(items) = raw else {
        return Err(ValidationError::RelaysNotArray);
    };
    let mut relays = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::String(relay) = item else {
            return Err(ValidationError::RelayNotString { index });
        };
        relays.push(relay.clone());
    }
    Ok(Some(relays))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{validate_template_file, EventTemplate, DEFAULT_KIND, DEFAULT_RELAYS};
    use crate::error::ValidationError;

    #[test]
    fn minimal_template_uses_defaults() {
        let template = EventTemplate::parse(r#"{"content":"hello"}"#).expect("valid");
        assert_eq!(template.kind, DEFAULT_KIND);
        assert!(template.tags.is_empty());
        assert_eq!(template.relays, None);
        let defaults: Vec<String> = DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect();
        assert_eq!(template.relay_strings_or(&defaults), defaults);

        let summary = template.summary();
        assert_eq!(summary.content_chars, 5);
        assert_eq!(summary.relays, None);
    }

    #[test]
    fn full_template_parses() {
        let raw = r#"{
            "kind": 30023,
            "content": "héllo",
            "tags": [["t", "nostr"], ["d", "post-1"]],
            "relays": ["wss://nos.lol", "ws://127.0.0.1:7777"]
        }"#;
        let template = EventTemplate::parse(raw).expect("valid");
        assert_eq!(template.kind, 30023);
        assert_eq!(template.tags[1], vec!["d".to_string(), "post-1".to_string()]);
        assert_eq!(template.relay_strings_or(&[])[1], "ws://127.0.0.1:7777");
        assert_eq!(template.summary().content_chars, 5);

        let unsigned = template.to_unsigned(1_700_000_000);
        assert_eq!(unsigned.created_at, 1_700_000_000);
        assert_eq!(unsigned.kind, 30023);
    }

    #[test]
    fn kind_zero_is_preserved() {
        let template = EventTemplate::parse(r#"{"content":"{}","kind":0}"#).expect("valid");
        assert_eq!(template.kind, 0);
    }

    #[test]
    fn integral_float_kind_is_accepted() {
        let template = EventTemplate::parse(r#"{"content":"x","kind":7.0}"#).expect("valid");
        assert_eq!(template.kind, 7);
    }

    #[test]
    fn content_must_be_string() {
        let err = EventTemplate::parse(r#"{"kind":1}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContent));
        let err = EventTemplate::parse(r#"{"content":42}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContent));
    }

    #[test]
    fn kind_must_be_non_negative_integer() {
        for raw in [
            r#"{"content":"x","kind":-1}"#,
            r#"{"content":"x","kind":1.5}"#,
            r#"{"content":"x","kind":"1"}"#,
        ] {
            let err = EventTemplate::parse(raw).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidKind), "input: {raw}");
        }
    }

    #[test]
    fn tag_shape_errors_report_index() {
        let cases = [
            (r#"{"content":"x","tags":{}}"#, "tags not array"),
            (r#"{"content":"x","tags":[["t"],"p"]}"#, "tag not array"),
            (r#"{"content":"x","tags":[["t"],[]]}"#, "empty tag"),
            (r#"{"content":"x","tags":[[1,"a"]]}"#, "name not string"),
            (r#"{"content":"x","tags":[["t",2]]}"#, "value not string"),
        ];
        let errors: Vec<ValidationError> = cases
            .iter()
            .map(|(raw, _)| EventTemplate::parse(raw).unwrap_err())
            .collect();
        assert!(matches!(errors[0], ValidationError::TagsNotArray));
        assert!(matches!(errors[1], ValidationError::TagNotArray { index: 1 }));
        assert!(matches!(errors[2], ValidationError::EmptyTag { index: 1 }));
        assert!(matches!(
            errors[3],
            ValidationError::TagNameNotString { index: 0 }
        ));
        assert!(matches!(
            errors[4],
            ValidationError::TagValueNotString { index: 0 }
        ));
    }

    #[test]
    fn content_length_counts_scalar_values() {
        let template = EventTemplate::parse(r#"{"content":"gm \ud83c\udf05"}"#).expect("valid");
        assert_eq!(template.content, "gm \u{1f305}");
        assert_eq!(template.summary().content_chars, 4);
    }

    #[test]
    fn non_string_tag_value_is_rejected_after_valid_name() {
        let err = EventTemplate::parse(r#"{"content":"x","tags":[["t","ok"],["e",1]]}"#)
            .unwrap_err();
        assert!(matches!(err, ValidationError::TagValueNotString { index: 1 }));
    }

    #[test]
    fn relay_shape_errors_and_warnings() {
        let err = EventTemplate::parse(r#"{"content":"x","relays":"wss://a"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::RelaysNotArray));
        let err = EventTemplate::parse(r#"{"content":"x","relays":["wss://a",3]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::RelayNotString { index: 1 }));

        let template =
            EventTemplate::parse(r#"{"content":"x","relays":["wss://a","https://b","ws://c"]}"#)
                .expect("non-websocket relays only warn");
        let warnings = template.relay_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 1);
        assert_eq!(warnings[0].relay, "https://b");
    }

    #[test]
    fn top_level_must_be_object() {
        let err = EventTemplate::parse("[1,2]").unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject));
        let err = EventTemplate::parse("{not json").unwrap_err();
        assert!(matches!(err, ValidationError::Json(_)));
    }

    #[test]
    fn validate_file_reports_missing_and_valid_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let err = validate_template_file(&missing).unwrap_err();
        assert!(matches!(err, ValidationError::FileNotFound(_)));

        let path = dir.path().join("event.json");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(
            file,
            r#"{{"content":"note","tags":[["t","a"]],"relays":["nos.lol"]}}"#
        )
        .expect("write");
        let summary = validate_template_file(&path).expect("valid file");
        assert_eq!(summary.tags, 1);
        assert_eq!(summary.relays, Some(1));
        assert_eq!(summary.warnings.len(), 1);
    }
}
