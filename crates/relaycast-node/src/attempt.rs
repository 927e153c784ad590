use std::fmt;
use std::time::Duration;

use relaycast_core::{RelayUrl, SignedEvent};
use relaycast_transport::{
    RejectionCategory, RelayAck, RelayConnection, RelayConnector, TransportError,
};
use serde::Serialize;
use tokio::time::Instant;

/// Terminal result of one publish attempt against one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected { reason: String },
    TimedOut,
    ConnectionFailed { reason: String },
}

impl AttemptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::TimedOut => f.write_str("timed out"),
            Self::ConnectionFailed { reason } => write!(f, "connection failed: {reason}"),
        }
    }
}

/// Publishes `event` to `relay` once, finishing no later than `deadline`.
///
/// Connection establishment is additionally bounded by `connect_timeout`.
/// The opened session is closed exactly once whichever way the attempt ends.
/// If the returned future is dropped early, the session is released by the
/// connection's `Drop` instead of the closing handshake.
pub async fn attempt(
    connector: &dyn RelayConnector,
    relay: &RelayUrl,
    event: &SignedEvent,
    deadline: Instant,
    connect_timeout: Duration,
) -> AttemptOutcome {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let connect_budget = connect_timeout.min(remaining);
    let deadline_bounds_connect = connect_timeout >= remaining;

    let connected =
        tokio::time::timeout(connect_budget, connector.connect(relay, connect_budget)).await;
    let mut connection = match connected {
        Ok(Ok(connection)) => connection,
        Ok(Err(TransportError::ConnectTimedOut)) | Err(_) => {
            return if deadline_bounds_connect {
                AttemptOutcome::TimedOut
            } else {
                AttemptOutcome::ConnectionFailed {
                    reason: TransportError::ConnectTimedOut.to_string(),
                }
            };
        }
        Ok(Err(err)) => {
            return AttemptOutcome::ConnectionFailed {
                reason: err.to_string(),
            }
        }
    };

    // A verdict that loses the race against the deadline is dropped here.
    let outcome = tokio::time::timeout_at(deadline, exchange(connection.as_mut(), event, deadline))
        .await
        .unwrap_or(AttemptOutcome::TimedOut);
    connection.close().await;
    outcome
}

async fn exchange(
    connection: &mut dyn RelayConnection,
    event: &SignedEvent,
    deadline: Instant,
) -> AttemptOutcome {
    if let Err(err) = connection.send_event(event).await {
        return AttemptOutcome::ConnectionFailed {
            reason: err.to_string(),
        };
    }
    match connection.await_ack(&event.id, deadline).await {
        Ok(RelayAck::Accepted { .. }) => AttemptOutcome::Accepted,
        Ok(RelayAck::Rejected { reason }) => {
            if RejectionCategory::from_reason(&reason) == RejectionCategory::Duplicate {
                AttemptOutcome::Accepted
            } else {
                AttemptOutcome::Rejected { reason }
            }
        }
        Err(TransportError::TimedOut) => AttemptOutcome::TimedOut,
        Err(err) => AttemptOutcome::ConnectionFailed {
            reason: err.to_string(),
        },
    }
}
