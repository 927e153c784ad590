//! NIP-01 relay message codec.
//!
//! Only the frames the publisher needs are decoded structurally: `OK` and
//! `NOTICE`. Every other relay message is reported by label and skipped.

use relaycast_core::SignedEvent;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON array with a string label")]
    MissingLabel,
    #[error("malformed OK frame")]
    MalformedOk,
}

/// Relay-to-client message relevant to publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Notice(String),
    /// `EVENT`, `EOSE`, `CLOSED`, `AUTH` or an unknown label.
    Other(String),
}

/// Encodes the client publish request `["EVENT", <event>]`.
pub fn encode_event_message(event: &SignedEvent) -> Result<String, WireError> {
    Ok(serde_json::to_string(&json!(["EVENT", event]))?)
}

pub fn parse_relay_message(input: &str) -> Result<RelayMessage, WireError> {
    let value: Value = serde_json::from_str(input)?;
    let array = value.as_array().ok_or(WireError::MissingLabel)?;
    let label = array
        .first()
        .and_then(Value::as_str)
        .ok_or(WireError::MissingLabel)?;
    match label {
        "OK" => {
            let event_id = array
                .get(1)
                .and_then(Value::as_str)
                .ok_or(WireError::MalformedOk)?;
            let accepted = array
                .get(2)
                .and_then(Value::as_bool)
                .ok_or(WireError::MalformedOk)?;
            // Some relays omit the message entirely.
            let message = array.get(3).and_then(Value::as_str).unwrap_or_default();
            Ok(RelayMessage::Ok {
                event_id: event_id.to_string(),
                accepted,
                message: message.to_string(),
            })
        }
        "NOTICE" => Ok(RelayMessage::Notice(
            array
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )),
        other => Ok(RelayMessage::Other(other.to_string())),
    }
}
