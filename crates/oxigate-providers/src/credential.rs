//! Credential resolver: picks the secret (or proxy password) for one call.

use std::fmt;

use tracing::{debug, warn};

use oxigate_core::secrets::{SecretStore, UserScope};

use crate::error::GatewayError;
use crate::registry::{ProviderProfile, Route};
use crate::request::Target;

/// An opaque upstream credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Read from the user's secret store.
    Secret(String),
    /// Supplied by the caller for their reverse proxy.
    ProxyPassword(String),
}

impl Credential {
    pub fn token(&self) -> &str {
        match self {
            Credential::Secret(s) | Credential::ProxyPassword(s) => s,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Secret(_) => f.write_str("Secret(<redacted>)"),
            Credential::ProxyPassword(_) => f.write_str("ProxyPassword(<redacted>)"),
        }
    }
}

/// Whether the caller's reverse proxy applies to this profile.
pub fn uses_reverse_proxy(profile: &ProviderProfile, target: &Target) -> bool {
    profile.reverse_proxy && non_empty(target.reverse_proxy.as_deref()).is_some()
}

/// Resolve the credential for `route` on behalf of `user`.
///
/// A reverse proxy the profile honors replaces the secret lookup entirely:
/// the proxy password (or nothing) is used. Otherwise the route's secret is
/// read from the store; absence is `MissingCredential` only for profiles
/// that require a key.
pub fn resolve(
    profile: &ProviderProfile,
    route: &Route,
    target: &Target,
    user: &UserScope,
    store: &dyn SecretStore,
) -> Result<Option<Credential>, GatewayError> {
    if uses_reverse_proxy(profile, target) {
        debug!(provider = profile.id, "using caller reverse proxy credential");
        return Ok(non_empty(target.proxy_password.as_deref())
            .map(|p| Credential::ProxyPassword(p.to_string())));
    }

    let secret = route.secret.and_then(|key| store.read(user, key));
    match secret {
        Some(secret) => Ok(Some(Credential::Secret(secret))),
        None if profile.requires_key => {
            warn!(provider = profile.id, user = user.name(), "No key found for provider");
            Err(GatewayError::MissingCredential(profile.id))
        }
        None => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::find_by_name;
    use crate::request::Capability;
    use oxigate_core::secrets::{keys, MemorySecretStore};

    fn resolve_for(
        id: &str,
        capability: Capability,
        target: &Target,
        store: &MemorySecretStore,
    ) -> Result<Option<Credential>, GatewayError> {
        let profile = find_by_name(id).unwrap();
        let route = profile.route(capability).unwrap();
        resolve(profile, route, target, &UserScope::new("alice"), store)
    }

    #[test]
    fn test_stored_secret() {
        let user = UserScope::new("alice");
        let store = MemorySecretStore::new().with(&user, keys::GROQ, "gsk-1");
        let cred = resolve_for("groq", Capability::Caption, &Target::default(), &store).unwrap();
        assert_eq!(cred, Some(Credential::Secret("gsk-1".to_string())));
    }

    #[test]
    fn test_secrets_are_per_user() {
        let bob = UserScope::new("bob");
        let store = MemorySecretStore::new().with(&bob, keys::OPENAI, "sk-bob");
        let err = resolve_for("openai", Capability::Caption, &Target::default(), &store).unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential("openai")));
    }

    #[test]
    fn test_missing_key_optional_provider() {
        let store = MemorySecretStore::new();
        for id in ["custom", "ooba", "koboldcpp", "llamacpp", "vllm", "pollinations"] {
            let cred = resolve_for(id, Capability::Caption, &Target::default(), &store).unwrap();
            assert!(cred.is_none(), "{id}");
        }
    }

    #[test]
    fn test_reverse_proxy_bypasses_store() {
        let user = UserScope::new("alice");
        let store = MemorySecretStore::new().with(&user, keys::OPENAI, "sk-stored");
        let target = Target {
            reverse_proxy: Some("https://proxy.local/v1".to_string()),
            proxy_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let cred = resolve_for("openai", Capability::Caption, &target, &store).unwrap();
        assert_eq!(cred, Some(Credential::ProxyPassword("hunter2".to_string())));
    }

    #[test]
    fn test_reverse_proxy_without_password_is_anonymous() {
        let target = Target {
            reverse_proxy: Some("https://proxy.local/v1".to_string()),
            ..Default::default()
        };
        let cred =
            resolve_for("xai", Capability::Caption, &target, &MemorySecretStore::new()).unwrap();
        assert!(cred.is_none());
    }

    #[test]
    fn test_reverse_proxy_ignored_by_other_profiles() {
        let target = Target {
            reverse_proxy: Some("https://proxy.local/v1".to_string()),
            proxy_password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let err =
            resolve_for("cohere", Capability::Caption, &target, &MemorySecretStore::new()).unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential("cohere")));
    }

    #[test]
    fn test_custom_speech_uses_tts_secret() {
        let user = UserScope::new("alice");
        let store = MemorySecretStore::new()
            .with(&user, keys::CUSTOM, "chat-key")
            .with(&user, keys::CUSTOM_OPENAI_TTS, "tts-key");
        let cred = resolve_for("custom", Capability::Speech, &Target::default(), &store).unwrap();
        assert_eq!(cred.unwrap().token(), "tts-key");
    }

    #[test]
    fn test_debug_is_redacted() {
        let cred = Credential::Secret("sk-very-secret".to_string());
        let shown = format!("{cred:?}");
        assert!(!shown.contains("sk-very-secret"));
    }
}
