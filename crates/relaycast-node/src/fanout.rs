//! Concurrent publish to many relays.
//!
//! Every relay runs in its own task with its own retry loop, so a slow or
//! failing relay never holds up the others. Each task owns exactly one slot
//! of the final report; slots are collected in the caller's relay order.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use relaycast_core::{dedup_relays, RelayUrl, SignedEvent};
use relaycast_transport::RelayConnector;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::attempt::{attempt, AttemptOutcome};
use crate::config::PublishConfig;
use crate::report::{EndpointReport, PublishReport};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{succeeded} relay(s) accepted the event, {required} required")]
    PublishFailed {
        succeeded: usize,
        required: usize,
        report: Box<PublishReport>,
    },
}

impl PublishError {
    /// Per-relay detail, available even though the publish failed.
    pub fn report(&self) -> &PublishReport {
        match self {
            Self::PublishFailed { report, .. } => report,
        }
    }
}

/// Fans a signed event out to a set of relays.
#[derive(Clone)]
pub struct Publisher {
    connector: Arc<dyn RelayConnector>,
    config: PublishConfig,
}

impl Publisher {
    pub fn new(connector: Arc<dyn RelayConnector>, config: PublishConfig) -> Self {
        Self { connector, config }
    }

    /// Publishes `event` to every relay in `relays` concurrently.
    ///
    /// Duplicate addresses are contacted once. Returns the report when at
    /// least `min_successes` relays accepted the event, and
    /// [`PublishError::PublishFailed`] carrying the same report otherwise.
    pub async fn publish(
        &self,
        event: Arc<SignedEvent>,
        relays: &[RelayUrl],
    ) -> Result<PublishReport, PublishError> {
        let relays = dedup_relays(relays);
        let overall_deadline = self.config.overall_timeout.map(|t| Instant::now() + t);
        info!(
            "publishing event {} to {} relay(s), finishing within {:?}",
            event.id,
            relays.len(),
            self.config.worst_case_duration()
        );

        let mut tasks = Vec::with_capacity(relays.len());
        for relay in &relays {
            let attempts = Arc::new(AtomicU32::new(0));
            let handle = tokio::spawn(drive_relay(
                Arc::clone(&self.connector),
                relay.clone(),
                Arc::clone(&event),
                self.config.clone(),
                overall_deadline,
                Arc::clone(&attempts),
            ));
            tasks.push((relay.clone(), attempts, handle));
        }

        let mut endpoints = Vec::with_capacity(tasks.len());
        for (relay, attempts, handle) in tasks {
            let endpoint = match handle.await {
                Ok(endpoint) => endpoint,
                Err(err) => {
                    warn!("publish task for {relay} ended abnormally: {err}");
                    EndpointReport {
                        relay,
                        attempts: attempts.load(Ordering::SeqCst),
                        outcome: AttemptOutcome::ConnectionFailed {
                            reason: "attempt task panicked".to_string(),
                        },
                    }
                }
            };
            endpoints.push(endpoint);
        }

        let report = PublishReport::new(event.id.clone(), endpoints);
        log_summary(&report);

        let succeeded = report.success_count();
        let required = self.config.min_successes;
        if succeeded >= required {
            Ok(report)
        } else {
            Err(PublishError::PublishFailed {
                succeeded,
                required,
                report: Box::new(report),
            })
        }
    }
}

async fn drive_relay(
    connector: Arc<dyn RelayConnector>,
    relay: RelayUrl,
    event: Arc<SignedEvent>,
    config: PublishConfig,
    overall_deadline: Option<Instant>,
    attempts: Arc<AtomicU32>,
) -> EndpointReport {
    let mut attempt_number: u32 = 0;
    loop {
        attempt_number = attempt_number.saturating_add(1);
        attempts.store(attempt_number, Ordering::SeqCst);

        let mut deadline = Instant::now() + config.per_attempt_timeout;
        if let Some(ceiling) = overall_deadline {
            deadline = deadline.min(ceiling);
        }
        let outcome = attempt(
            connector.as_ref(),
            &relay,
            &event,
            deadline,
            config.connect_timeout,
        )
        .await;

        if outcome.is_accepted() {
            info!("{relay} accepted event {} (attempt {attempt_number})", event.id);
        } else {
            warn!("{relay} attempt {attempt_number} failed: {outcome}");
        }

        let decision = config.retry.should_retry(&relay, attempt_number, &outcome);
        let out_of_time = overall_deadline
            .is_some_and(|ceiling| Instant::now() + decision.delay >= ceiling);
        if !decision.retry || out_of_time {
            if decision.retry {
                warn!("{relay}: publish deadline reached, giving up after {attempt_number} attempt(s)");
            }
            return EndpointReport {
                relay,
                attempts: attempt_number,
                outcome,
            };
        }
        warn!(
            "retrying {relay} in {}ms (attempt {} of {})",
            decision.delay.as_millis(),
            attempt_number + 1,
            config.retry.attempt_limit()
        );
        tokio::time::sleep(decision.delay).await;
    }
}

fn log_summary(report: &PublishReport) {
    let total = report.total();
    info!("successful {}/{total}", report.success_count());
    let failed: Vec<_> = report.failed().collect();
    if failed.is_empty() {
        return;
    }
    warn!("failed {}/{total}", failed.len());
    for endpoint in failed {
        warn!(
            "  {}: {} after {} attempt(s)",
            endpoint.relay, endpoint.outcome, endpoint.attempts
        );
    }
}
