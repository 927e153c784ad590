//! Core relaycast primitives shared across crates.
//!
//! Includes the signed event model, validated relay addresses, event template
//! parsing/validation and the shared validation error type.

pub mod error;
pub mod template;
pub mod types;

pub use error::ValidationError;
pub use template::{
    validate_template_file, EventTemplate, RelayWarning, TemplateSummary, DEFAULT_KIND,
    DEFAULT_RELAYS,
};
pub use types::{dedup_relays, RelayUrl, SignedEvent, Tag, UnsignedEvent};
