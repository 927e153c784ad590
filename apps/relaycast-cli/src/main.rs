mod config;
mod error;
mod publish;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relaycast_core::{validate_template_file, TemplateSummary};
use relaycast_crypto::keys::{encode_npub, encode_nsec, generate_secret_key};
use relaycast_crypto::signing::{NostrSigner, Signer};
use relaycast_node::PublishReport;
use tracing::{error, info};

use crate::config::CliConfig;
use crate::error::CliError;
use crate::publish::{resolve_secret, run_publish};

#[derive(Parser)]
#[command(name = "relaycast", author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (.toml, .json, .yaml or .env)
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an event template and publish it to its relays
    Publish {
        /// Event template JSON file
        template: PathBuf,
        /// Secret key as nsec or hex; read from `secret_env` when omitted
        #[arg(long, env = "NOSTR_NSEC", hide_env_values = true)]
        secret: Option<String>,
        /// Print the publish report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check an event template without publishing it
    Validate {
        /// Event template JSON file
        template: PathBuf,
    },
    /// Generate a fresh identity and print its keys
    Identity,
}

fn print_summary(summary: &TemplateSummary) {
    println!("Event template is valid!");
    println!("   Kind: {}", summary.kind);
    println!("   Content length: {} characters", summary.content_chars);
    println!("   Tags: {}", summary.tags);
    match summary.relays {
        Some(count) => println!("   Relays: {count}"),
        None => println!("   Relays: default"),
    }
}

fn print_report(report: &PublishReport, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "Event {} published to {}/{} relay(s) ({:?})",
        report.event_id,
        report.success_count(),
        report.total(),
        report.status
    );
    for endpoint in &report.endpoints {
        println!(
            "   {}: {} ({} attempt(s))",
            endpoint.relay, endpoint.outcome, endpoint.attempts
        );
    }
    Ok(())
}

fn identity() -> Result<(), CliError> {
    let secret = generate_secret_key();
    let signer = NostrSigner::from_secret(secret)?;
    println!("nsec: {}", encode_nsec(secret)?);
    println!("npub: {}", encode_npub(signer.public_key())?);
    println!("hex:  {}", signer.public_key_hex());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Validate { template } => {
            let summary = validate_template_file(&template)?;
            print_summary(&summary);
            Ok(())
        }
        Commands::Identity => identity(),
        Commands::Publish {
            template,
            secret,
            json,
        } => {
            let config = CliConfig::new(cli.config)?;
            let secret = resolve_secret(secret, &config.secret_env)?;
            match run_publish(&template, &secret, &config).await {
                Ok(report) => {
                    info!(
                        "event published successfully to {} relay(s)",
                        report.success_count()
                    );
                    print_report(&report, json)
                }
                Err(CliError::Publish(err)) => {
                    print_report(err.report(), json)?;
                    Err(CliError::Publish(err))
                }
                Err(err) => Err(err),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = std::env::var("RELAYCAST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        error!("a TLS crypto provider was already installed");
    }

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}
