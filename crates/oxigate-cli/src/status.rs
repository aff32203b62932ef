//! `oxigate status`: show configuration and provider status.
//!
//! - Shows config path, listen address, secrets root
//! - Shows each provider's capabilities and whether the user has its key

use anyhow::Result;
use colored::Colorize;

use oxigate_core::config::{get_config_path, load_config};
use oxigate_core::secrets::{SecretStore, UserScope};
use oxigate_providers::{ProviderProfile, PROVIDERS};

use crate::helpers::{mark, secret_store, user_scope};

/// Run the status command.
pub fn run(user: Option<&str>) -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();
    let store = secret_store(&config);
    let user = user_scope(&config, user);

    println!();
    println!("{}", "🦀 Oxigate Status".cyan().bold());
    println!();

    let config_state = if config_path.exists() {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    };
    println!("  {:<12} {} {}", "Config:".bold(), config_path.display(), config_state);
    println!(
        "  {:<12} {}:{}",
        "Listen:".bold(),
        config.gateway.host,
        config.gateway.port
    );
    println!("  {:<12} {}", "Secrets:".bold(), store.root().display());
    println!("  {:<12} {}", "User:".bold(), user.name());

    println!();
    println!("  {}", "Providers:".bold());
    for row in provider_rows(&store, &user) {
        println!(
            "    {:<20} {:<48} {}",
            row.display_name,
            row.capabilities.dimmed(),
            mark(row.ready, row.key_state)
        );
    }
    println!();

    Ok(())
}

/// One line of the provider table.
struct ProviderRow {
    display_name: &'static str,
    capabilities: String,
    key_state: &'static str,
    ready: bool,
}

fn provider_rows(store: &dyn SecretStore, user: &UserScope) -> Vec<ProviderRow> {
    PROVIDERS.iter().map(|p| provider_row(p, store, user)).collect()
}

fn provider_row(profile: &ProviderProfile, store: &dyn SecretStore, user: &UserScope) -> ProviderRow {
    let capabilities = profile
        .routes
        .iter()
        .map(|r| r.capability.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let secrets: Vec<&str> = profile.routes.iter().filter_map(|r| r.secret).collect();
    let has_key = secrets.iter().any(|key| store.read(user, key).is_some());

    let (key_state, ready) = match (secrets.is_empty(), has_key, profile.requires_key) {
        (true, _, _) => ("no key needed", true),
        (false, true, _) => ("key set", true),
        (false, false, false) => ("key optional", true),
        (false, false, true) => ("not configured", false),
    };

    ProviderRow {
        display_name: profile.display_name,
        capabilities,
        key_state,
        ready,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
