//! `oxigate onboard`: initialize configuration and the secrets directory.
//!
//! - Creates `~/.oxigate/config.json` with defaults
//! - Creates the secrets root and the default user's directory

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use oxigate_core::config::{get_config_path, load_config, save_config, Config};
use oxigate_core::utils::expand_home;

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "🦀 Oxigate — Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    let config = load_config(None);
    for line in initialize(&config, &config_path)? {
        println!("  {} {}", "✓".green(), line);
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Store a key with `oxigate secrets set`, then run `oxigate serve`.".green()
    );
    println!();
    Ok(())
}

/// Write `config` to `config_path` unless a file exists there, then create
/// the default user's secrets directory. Returns one line per step.
fn initialize(config: &Config, config_path: &Path) -> Result<Vec<String>> {
    let mut report = Vec::new();

    if config_path.exists() {
        report.push(format!("config already exists at {}", config_path.display()));
    } else {
        save_config(config, Some(config_path))
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        report.push(format!("created config at {}", config_path.display()));
    }

    let secrets = crate::helpers::secret_store(config);
    let user = crate::helpers::user_scope(config, None);
    let user_dir = secrets.root().join(user.dir_name());
    std::fs::create_dir_all(&user_dir)
        .with_context(|| format!("failed to create {}", user_dir.display()))?;
    report.push(format!("secrets for {} at {}", user.name(), user_dir.display()));

    if let Some(dir) = config.gateway.upload_dir.as_deref().filter(|d| !d.trim().is_empty()) {
        let dir = expand_home(dir);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        report.push(format!("upload dir at {}", dir.display()));
    }

    Ok(report)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
