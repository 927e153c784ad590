use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use relaycast_core::{EventTemplate, RelayUrl, SignedEvent};
use relaycast_crypto::event::{sign_event, verify_event};
use relaycast_crypto::keys::decode_secret_key;
use relaycast_crypto::signing::NostrSigner;
use relaycast_node::{PublishReport, Publisher};
use relaycast_transport_websocket::{WebSocketConnector, WebSocketConnectorConfig};
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::error::CliError;

/// Secret from the command line, falling back to the `secret_env` variable.
pub fn resolve_secret(flag: Option<String>, secret_env: &str) -> Result<String, CliError> {
    flag.or_else(|| std::env::var(secret_env).ok())
        .filter(|secret| !secret.trim().is_empty())
        .ok_or_else(|| CliError::MissingSecret(secret_env.to_string()))
}

/// Signs `template` as of `created_at` and checks the result before it leaves.
pub fn sign_template(
    template: &EventTemplate,
    secret: &str,
    created_at: u64,
) -> Result<SignedEvent, CliError> {
    let signer = NostrSigner::from_secret(decode_secret_key(secret)?)?;
    let event = sign_event(&signer, template.to_unsigned(created_at))?;
    verify_event(&event)?;
    Ok(event)
}

/// Parses the template's relays (or `defaults`), skipping unusable entries.
pub fn publish_targets(template: &EventTemplate, defaults: &[String]) -> Vec<RelayUrl> {
    template
        .relay_strings_or(defaults)
        .iter()
        .filter_map(|raw| match RelayUrl::parse(raw) {
            Ok(relay) => Some(relay),
            Err(err) => {
                warn!("skipping relay: {err}");
                None
            }
        })
        .collect()
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub async fn run_publish(
    template_path: &Path,
    secret: &str,
    config: &CliConfig,
) -> Result<PublishReport, CliError> {
    info!("processing template: {}", template_path.display());
    let template = EventTemplate::load(template_path)?;
    let event = sign_template(&template, secret, unix_now())?;
    info!("signed event {} (kind {})", event.id, event.kind);

    let relays = publish_targets(&template, &config.default_relays);
    let connector = Arc::new(WebSocketConnector::new(WebSocketConnectorConfig::default()));
    let publisher = Publisher::new(connector, config.publish_config());
    Ok(publisher.publish(Arc::new(event), &relays).await?)
}
