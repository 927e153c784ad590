use relaycast_core::ValidationError;
use relaycast_crypto::event::EventVerifyError;
use relaycast_crypto::keys::KeyError;
use relaycast_crypto::signing::SigningError;
use relaycast_node::PublishError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to load config: {0}")]
    Config(#[from] config::ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("{0} environment variable is required")]
    MissingSecret(String),
    #[error("invalid secret key: {0}")]
    Key(#[from] KeyError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("signed event failed self-check: {0}")]
    SelfCheck(#[from] EventVerifyError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
