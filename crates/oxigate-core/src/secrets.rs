//! Per-user secret storage: the credential source behind every provider.
//!
//! Secrets are opaque strings keyed by `(user scope, secret key)`. The gateway
//! only ever reads them; writes happen out of band (CLI `secrets set`).
//!
//! On disk each user owns `<root>/<user>/secrets.json`, a flat JSON object
//! mapping secret keys (see [`keys`]) to values.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::utils::safe_filename;

/// Well-known secret keys, one per upstream credential.
pub mod keys {
    pub const OPENAI: &str = "api_key_openai";
    pub const OPENROUTER: &str = "api_key_openrouter";
    pub const XAI: &str = "api_key_xai";
    pub const MISTRALAI: &str = "api_key_mistralai";
    pub const GROQ: &str = "api_key_groq";
    pub const COHERE: &str = "api_key_cohere";
    pub const AIMLAPI: &str = "api_key_aimlapi";
    pub const MOONSHOT: &str = "api_key_moonshot";
    pub const NANOGPT: &str = "api_key_nanogpt";
    pub const ELECTRONHUB: &str = "api_key_electronhub";
    pub const CUSTOM: &str = "api_key_custom";
    pub const CUSTOM_OPENAI_TTS: &str = "api_key_custom_openai_tts";
    pub const OOBA: &str = "api_key_ooba";
    pub const KOBOLDCPP: &str = "api_key_koboldcpp";
    pub const LLAMACPP: &str = "api_key_llamacpp";
    pub const VLLM: &str = "api_key_vllm";
}

/// Errors from writing or listing secrets.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("secret file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────
// UserScope
// ─────────────────────────────────────────────

/// The account whose secrets a request may use.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserScope(String);

impl UserScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Directory name for this user, safe against path traversal.
    pub fn dir_name(&self) -> String {
        safe_filename(&self.0).replace("..", "__")
    }
}

// ─────────────────────────────────────────────
// SecretStore trait
// ─────────────────────────────────────────────

/// Read-only secret lookup used by the credential resolver.
///
/// Implementations must be safe to call concurrently from many requests.
pub trait SecretStore: Send + Sync {
    /// The secret stored under `key` for `user`, if any. Empty values count as absent.
    fn read(&self, user: &UserScope, key: &str) -> Option<String>;
}

// ─────────────────────────────────────────────
// FileSecretStore
// ─────────────────────────────────────────────

/// Secrets stored as one JSON file per user under a root directory.
#[derive(Clone, Debug)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the secrets file for `user`.
    pub fn path_for(&self, user: &UserScope) -> PathBuf {
        self.root.join(user.dir_name()).join("secrets.json")
    }

    /// Store (or replace) one secret for `user`.
    pub fn write(&self, user: &UserScope, key: &str, value: &str) -> Result<(), SecretError> {
        let path = self.path_for(user);
        let mut secrets = load_file(&path)?;
        secrets.insert(key.to_string(), value.to_string());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&secrets)?)?;
        debug!(user = user.name(), key, "secret written");
        Ok(())
    }

    /// Keys (never values) of every secret stored for `user`.
    pub fn list_keys(&self, user: &UserScope) -> Result<Vec<String>, SecretError> {
        Ok(load_file(&self.path_for(user))?.into_keys().collect())
    }
}

impl SecretStore for FileSecretStore {
    fn read(&self, user: &UserScope, key: &str) -> Option<String> {
        let path = self.path_for(user);
        match load_file(&path) {
            Ok(mut secrets) => secrets.remove(key).filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read secrets");
                None
            }
        }
    }
}

/// Read a secrets file; a missing file is an empty store.
fn load_file(path: &Path) -> Result<BTreeMap<String, String>, SecretError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

// ─────────────────────────────────────────────
// MemorySecretStore
// ─────────────────────────────────────────────

/// In-memory store, used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<(String, String), String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: &UserScope, key: &str, value: impl Into<String>) {
        if let Ok(mut secrets) = self.secrets.write() {
            secrets.insert((user.name().to_string(), key.to_string()), value.into());
        }
    }

    /// Builder-style insert.
    pub fn with(self, user: &UserScope, key: &str, value: impl Into<String>) -> Self {
        self.insert(user, key, value);
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn read(&self, user: &UserScope, key: &str) -> Option<String> {
        let secrets = self.secrets.read().ok()?;
        secrets
            .get(&(user.name().to_string(), key.to_string()))
            .filter(|v| !v.is_empty())
            .cloned()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
