//! relaycast publish coordination.
//!
//! This crate drives one signed event to many relays at once: a bounded
//! publish attempt per relay, a retry policy for failed attempts, and a
//! fan-out coordinator that aggregates every relay's outcome into one report.

pub mod attempt;
pub mod config;
pub mod fanout;
pub mod report;
pub mod retry;

pub use attempt::{attempt, AttemptOutcome};
pub use config::PublishConfig;
pub use fanout::{PublishError, Publisher};
pub use report::{EndpointReport, PublishReport, PublishStatus};
pub use retry::{RetryDecision, RetryPolicy};
