//! Oxigate CLI: entry point.
//!
//! # Commands
//!
//! - `oxigate serve [--host HOST] [--port PORT] [--logs]`: run the HTTP gateway
//! - `oxigate onboard`: write the default config and secrets directory
//! - `oxigate status`: show configuration and provider status
//! - `oxigate secrets set|list`: manage a user's provider secrets

mod helpers;
mod onboard;
mod secrets_cmd;
mod serve;
mod status;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Oxigate: multi-provider AI gateway for captioning, speech and transcription
#[derive(Parser)]
#[command(name = "oxigate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Initialize configuration and the secrets directory
    Onboard,

    /// Show configuration and provider status
    Status {
        /// User whose stored keys are reported
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Manage per-user provider secrets
    Secrets {
        #[command(subcommand)]
        action: secrets_cmd::SecretsCommands,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, logs } => {
            init_logging(logs);
            serve::run(host, port).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status { user } => status::run(user.as_deref()),
        Commands::Secrets { action } => {
            init_logging(false);
            secrets_cmd::dispatch(action)
        }
    }
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise `--logs` turns on debug output for
/// the oxigate crates.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("oxigate=debug,oxigate_core=debug,oxigate_providers=debug,oxigate_gateway=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
