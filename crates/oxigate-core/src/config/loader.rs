//! Config loader: reads `~/.oxigate/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.oxigate/config.json`
//! 3. Environment variables `OXIGATE_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `OXIGATE_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `OXIGATE_GATEWAY__HOST` → `gateway.host`
/// - `OXIGATE_GATEWAY__PORT` → `gateway.port`
/// - `OXIGATE_GATEWAY__DEFAULT_USER` → `gateway.default_user`
/// - `OXIGATE_GATEWAY__UPLOAD_DIR` → `gateway.upload_dir`
/// - `OXIGATE_CAPTION__SYSTEM_PROMPT` → `caption.system_prompt`
/// - `OXIGATE_SECRETS__ROOT` → `secrets.root`
/// - `OXIGATE_PROVIDERS__<ID>__API_BASE` → `providers.<id>.api_base`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("OXIGATE_GATEWAY__HOST") {
        config.gateway.host = val;
    }
    if let Ok(val) = std::env::var("OXIGATE_GATEWAY__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.gateway.port = p;
        }
    }
    if let Ok(val) = std::env::var("OXIGATE_GATEWAY__DEFAULT_USER") {
        config.gateway.default_user = val;
    }
    if let Ok(val) = std::env::var("OXIGATE_GATEWAY__UPLOAD_DIR") {
        config.gateway.upload_dir = Some(val);
    }
    if let Ok(val) = std::env::var("OXIGATE_CAPTION__SYSTEM_PROMPT") {
        config.caption.system_prompt = val;
    }
    if let Ok(val) = std::env::var("OXIGATE_SECRETS__ROOT") {
        config.secrets.root = val;
    }

    // Provider API bases: OXIGATE_PROVIDERS__OPENAI__API_BASE → providers.openai
    for (key, val) in std::env::vars() {
        if let Some(id) = key
            .strip_prefix("OXIGATE_PROVIDERS__")
            .and_then(|rest| rest.strip_suffix("__API_BASE"))
        {
            config
                .providers
                .entry(id.to_lowercase())
                .or_default()
                .api_base = Some(val);
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
