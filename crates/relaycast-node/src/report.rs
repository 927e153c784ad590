use relaycast_core::RelayUrl;
use serde::Serialize;

use crate::attempt::AttemptOutcome;

/// Final state of one relay after all of its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointReport {
    pub relay: RelayUrl,
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    FullSuccess,
    PartialSuccess,
    TotalFailure,
}

impl PublishStatus {
    /// An empty relay set has no successes and counts as a total failure.
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        if succeeded == 0 {
            Self::TotalFailure
        } else if succeeded == total {
            Self::FullSuccess
        } else {
            Self::PartialSuccess
        }
    }
}

/// Aggregate of one publish call, listing relays in the caller's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub event_id: String,
    pub endpoints: Vec<EndpointReport>,
    pub status: PublishStatus,
}

impl PublishReport {
    pub fn new(event_id: impl Into<String>, endpoints: Vec<EndpointReport>) -> Self {
        let succeeded = endpoints.iter().filter(|e| e.outcome.is_accepted()).count();
        let status = PublishStatus::from_counts(succeeded, endpoints.len());
        Self {
            event_id: event_id.into(),
            endpoints,
            status,
        }
    }

    pub fn total(&self) -> usize {
        self.endpoints.len()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &EndpointReport> {
        self.endpoints.iter().filter(|e| e.outcome.is_accepted())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EndpointReport> {
        self.endpoints.iter().filter(|e| !e.outcome.is_accepted())
    }

    pub fn endpoint(&self, relay: &RelayUrl) -> Option<&EndpointReport> {
        self.endpoints.iter().find(|e| &e.relay == relay)
    }
}
