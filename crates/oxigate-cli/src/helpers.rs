//! Shared CLI helpers: banner, status marks, user scope resolution.

use colored::Colorize;

use oxigate_core::config::Config;
use oxigate_core::secrets::{FileSecretStore, UserScope};
use oxigate_core::utils::expand_home;

/// Print the banner shown when the gateway starts.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "🦀 Oxigate".cyan().bold(), version.dimmed());
    println!();
}

/// `✓` / `·` marker followed by `label`.
pub fn mark(ok: bool, label: &str) -> String {
    if ok {
        format!("{} {}", "✓".green(), label)
    } else {
        format!("{}", format!("· {label}").dimmed())
    }
}

/// The secret store configured in `config`.
pub fn secret_store(config: &Config) -> FileSecretStore {
    FileSecretStore::new(expand_home(&config.secrets.root))
}

/// `--user` if given and non-blank, else the configured default user.
pub fn user_scope(config: &Config, user: Option<&str>) -> UserScope {
    let name = user
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(config.gateway.default_user.as_str());
    UserScope::new(name)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
