use std::time::Duration;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Bound on one attempt: connect, send and acknowledgement together.
    pub per_attempt_timeout: Duration,
    /// Bound on connection establishment inside an attempt.
    pub connect_timeout: Duration,
    /// Ceiling across every attempt and backoff of one publish call.
    pub overall_timeout: Option<Duration>,
    /// Accepting relays required for the publish call to succeed.
    pub min_successes: usize,
    pub retry: RetryPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            per_attempt_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            overall_timeout: None,
            min_successes: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl PublishConfig {
    pub fn max_attempts_per_endpoint(&self) -> u32 {
        self.retry.attempt_limit()
    }

    /// Longest a publish call can run when every relay stays unresponsive.
    pub fn worst_case_duration(&self) -> Duration {
        let limit = self.max_attempts_per_endpoint();
        let attempts = self.per_attempt_timeout.saturating_mul(limit);
        let backoff = (1..limit).fold(Duration::ZERO, |total, n| {
            total.saturating_add(self.retry.backoff(n))
        });
        let unbounded = attempts.saturating_add(backoff);
        match self.overall_timeout {
            Some(ceiling) => unbounded.min(ceiling),
            None => unbounded,
        }
    }
}
