//! Configuration schema: typed view of `~/.oxigate/config.json`.
//!
//! Hierarchy: `Config` → `GatewayConfig`, `CaptionConfig`, `SecretsConfig`,
//! per-provider `ProviderConfig`, and the `additionalHeaders` rules.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.oxigate/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub caption: CaptionConfig,
    pub secrets: SecretsConfig,
    /// Operator overrides keyed by provider id (e.g. `"openai"`).
    ///
    /// A map rather than one field per provider: profiles are registry data,
    /// so adding one never touches the config schema.
    pub providers: HashMap<String, ProviderConfig>,
    /// Header-injection rules applied to every outgoing upstream call.
    pub additional_headers: Vec<HeaderRule>,
}

impl Config {
    /// Operator overrides for one provider, if any were configured.
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.get(id)
    }
}

// ─────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────

/// HTTP listener and request-handling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// User scope used when a request carries no `X-Oxigate-User` header.
    pub default_user: String,
    /// Directory for temporary audio uploads. System temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18800,
            default_user: "default-user".to_string(),
            upload_dir: None,
            timeout_secs: 120,
        }
    }
}

// ─────────────────────────────────────────────
// Caption
// ─────────────────────────────────────────────

/// Image captioning settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionConfig {
    /// System prompt prepended to every captioning request. Empty = none.
    pub system_prompt: String,
}

impl CaptionConfig {
    /// The configured system prompt, if one is set.
    pub fn system_prompt(&self) -> Option<&str> {
        let prompt = self.system_prompt.trim();
        (!prompt.is_empty()).then_some(self.system_prompt.as_str())
    }
}

// ─────────────────────────────────────────────
// Secrets
// ─────────────────────────────────────────────

/// Where per-user secrets live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretsConfig {
    /// Root directory; each user gets `<root>/<user>/secrets.json`.
    pub root: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            root: "~/.oxigate/users".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Operator overrides for a single upstream provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Replaces the provider's fixed API base (e.g. a regional endpoint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Default body parameters, merged when the request does not set them.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    /// Top-level body fields never sent to this provider.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_body: Vec<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

// ─────────────────────────────────────────────
// Header rules
// ─────────────────────────────────────────────

/// Headers added to every upstream call whose URL starts with `url_prefix`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderRule {
    pub url_prefix: String,
    pub headers: HashMap<String, String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
