use std::path::PathBuf;

use thiserror::Error;

/// Malformed event template or relay address.
///
/// Validation failures are fatal for a publish run and are never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),
    #[error("template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("template must be a JSON object")]
    NotAnObject,
    #[error("missing or invalid \"content\" field (must be string)")]
    InvalidContent,
    #[error("invalid \"kind\" field (must be non-negative integer)")]
    InvalidKind,
    #[error("invalid \"tags\" field (must be array)")]
    TagsNotArray,
    #[error("invalid tag at index {index} (must be array)")]
    TagNotArray { index: usize },
    #[error("empty tag at index {index}")]
    EmptyTag { index: usize },
    #[error("invalid tag type at index {index} (first element must be string)")]
    TagNameNotString { index: usize },
    #[error("invalid tag value at index {index} (all elements must be strings)")]
    TagValueNotString { index: usize },
    #[error("invalid \"relays\" field (must be array)")]
    RelaysNotArray,
    #[error("invalid relay at index {index} (must be string)")]
    RelayNotString { index: usize },
    #[error("invalid relay url {url:?}: {reason}")]
    InvalidRelayUrl { url: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            ValidationError::InvalidContent.to_string(),
            "missing or invalid \"content\" field (must be string)"
        );
        assert_eq!(
            ValidationError::EmptyTag { index: 2 }.to_string(),
            "empty tag at index 2"
        );
        assert_eq!(
            ValidationError::InvalidRelayUrl {
                url: "http://x".to_string(),
                reason: "scheme must be ws:// or wss://",
            }
            .to_string(),
            "invalid relay url \"http://x\": scheme must be ws:// or wss://"
        );
    }
}
