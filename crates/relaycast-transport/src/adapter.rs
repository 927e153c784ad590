use std::time::Duration;

use async_trait::async_trait;
use relaycast_core::{RelayUrl, SignedEvent};
use thiserror::Error;
use tokio::time::Instant;

/// Relay verdict on a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAck {
    Accepted { message: String },
    Rejected { reason: String },
}

/// Machine-readable class of a relay message, taken from its `prefix:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    /// Relay already stores the event.
    Duplicate,
    RateLimited,
    /// Relay-side internal failure.
    Error,
    Invalid,
    Pow,
    Blocked,
    Restricted,
    AuthRequired,
    Mute,
    /// No recognised prefix.
    Unknown,
}

impl RejectionCategory {
    pub fn from_reason(reason: &str) -> Self {
        let Some((prefix, _)) = reason.split_once(':') else {
            return Self::Unknown;
        };
        match prefix.trim() {
            "duplicate" => Self::Duplicate,
            "rate-limited" => Self::RateLimited,
            "error" => Self::Error,
            "invalid" => Self::Invalid,
            "pow" => Self::Pow,
            "blocked" => Self::Blocked,
            "restricted" => Self::Restricted,
            "auth-required" => Self::AuthRequired,
            "mute" => Self::Mute,
            _ => Self::Unknown,
        }
    }

    /// Whether resending the identical event later could succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::Error)
    }
}

/// Transport-level failure while talking to one relay.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out")]
    ConnectTimedOut,
    #[error("send failed: {0}")]
    Send(String),
    #[error("connection closed: {0}")]
    Closed(String),
    #[error("timed out waiting for acknowledgement")]
    TimedOut,
}

/// Opens sessions to relays. Injected into the publish coordinator.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Opens one session to `relay`, giving up after `timeout`.
    async fn connect(
        &self,
        relay: &RelayUrl,
        timeout: Duration,
    ) -> Result<Box<dyn RelayConnection>, TransportError>;
}

/// One live session to one relay.
#[async_trait]
pub trait RelayConnection: Send {
    /// Sends the publish request for `event`.
    async fn send_event(&mut self, event: &SignedEvent) -> Result<(), TransportError>;

    /// Waits for the relay verdict on `event_id`, ignoring unrelated traffic.
    async fn await_ack(
        &mut self,
        event_id: &str,
        deadline: Instant,
    ) -> Result<RelayAck, TransportError>;

    /// Closes the session. Idempotent and infallible.
    ///
    /// Implementations also release the session on drop, so an unclosed
    /// connection never outlives a cancelled caller.
    async fn close(&mut self);
}
