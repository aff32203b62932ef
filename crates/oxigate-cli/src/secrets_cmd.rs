//! `oxigate secrets`: manage per-user provider secrets from the CLI.
//!
//! - `oxigate secrets set KEY VALUE [--user USER]`
//! - `oxigate secrets list [--user USER]`: key names only, never values

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tracing::warn;

use oxigate_core::config::load_config;
use oxigate_core::secrets::FileSecretStore;
use oxigate_core::secrets::UserScope;
use oxigate_providers::PROVIDERS;

use crate::helpers::{secret_store, user_scope};

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

/// Secrets subcommands.
#[derive(Subcommand)]
pub enum SecretsCommands {
    /// Store a secret (e.g. `api_key_openai`) for a user
    Set {
        /// Secret key
        key: String,
        /// Secret value
        value: String,
        /// User the secret belongs to (defaults to the configured default user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// List the secret keys stored for a user
    List {
        /// User to list (defaults to the configured default user)
        #[arg(short, long)]
        user: Option<String>,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

/// Dispatch a secrets subcommand.
pub fn dispatch(cmd: SecretsCommands) -> Result<()> {
    let config = load_config(None);
    let store = secret_store(&config);

    match cmd {
        SecretsCommands::Set { key, value, user } => {
            let user = user_scope(&config, user.as_deref());
            set(&store, &user, &key, &value)?;
            println!("  {} stored {} for {}", "✓".green(), key.bold(), user.name());
        }
        SecretsCommands::List { user } => {
            let user = user_scope(&config, user.as_deref());
            let stored = store
                .list_keys(&user)
                .with_context(|| format!("failed to read secrets for {}", user.name()))?;
            println!();
            println!("  {} {}", "Secrets for".bold(), user.name());
            if stored.is_empty() {
                println!("    {}", "(none)".dimmed());
            }
            for key in stored {
                println!("    {key}");
            }
            println!();
        }
    }
    Ok(())
}

/// Write one secret, warning when no provider reads `key`.
fn set(store: &FileSecretStore, user: &UserScope, key: &str, value: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("secret key must not be empty");
    }
    if !is_known_key(key) {
        warn!(key, "no provider reads this secret key");
    }
    store
        .write(user, key, value)
        .with_context(|| format!("failed to store {key} for {}", user.name()))
}

/// Whether any provider route reads `key`.
fn is_known_key(key: &str) -> bool {
    PROVIDERS
        .iter()
        .flat_map(|p| p.routes.iter())
        .any(|r| r.secret == Some(key))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
