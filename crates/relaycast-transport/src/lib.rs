//! Transport abstractions for relaycast.
//!
//! The publish coordinator only depends on the connector/connection traits
//! defined in this crate; concrete transports live in sibling crates.

pub mod adapter;
pub mod scripted;

pub use adapter::{RejectionCategory, RelayAck, RelayConnection, RelayConnector, TransportError};
pub use scripted::{ScriptedConnector, ScriptedStep};
