use std::time::Duration;

use rand::Rng;
use relaycast_core::RelayUrl;
use relaycast_transport::RejectionCategory;
use tracing::debug;

use crate::attempt::AttemptOutcome;

/// Bounded exponential backoff applied to each relay independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per relay including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Equal jitter: the delay is drawn from `[d/2, d]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryDecision {
    pub const STOP: Self = Self {
        retry: false,
        delay: Duration::ZERO,
    };
}

impl RetryPolicy {
    /// Never retries; every relay gets exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Effective attempt ceiling, never below one.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Un-jittered delay before the attempt following attempt `attempt_number`.
    pub fn backoff(&self, attempt_number: u32) -> Duration {
        let exponent = attempt_number.saturating_sub(1).min(20);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Decides whether `relay` gets another attempt after `last` was its
    /// `attempt_number`-th outcome (1-based).
    pub fn should_retry(
        &self,
        relay: &RelayUrl,
        attempt_number: u32,
        last: &AttemptOutcome,
    ) -> RetryDecision {
        if attempt_number >= self.attempt_limit() {
            return RetryDecision::STOP;
        }
        match last {
            AttemptOutcome::Accepted => return RetryDecision::STOP,
            AttemptOutcome::Rejected { reason } => {
                let category = RejectionCategory::from_reason(reason);
                if !category.is_transient() {
                    debug!("{relay} rejected with {category:?}; not retrying");
                    return RetryDecision::STOP;
                }
            }
            AttemptOutcome::TimedOut | AttemptOutcome::ConnectionFailed { .. } => {}
        }
        RetryDecision {
            retry: true,
            delay: self.jittered(self.backoff(attempt_number)),
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let half = delay / 2;
        let spread = (delay - half).as_millis() as u64;
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}
