//! Error normalizer: one taxonomy for every way a gateway call can fail.
//!
//! Upstream quirks never decide the *kind* of an error: the dispatcher hands
//! back the raw status and body, and [`check_status`] classifies it here.
//! Each kind maps to exactly one caller-facing status and body.

use crate::request::{Capability, RawUpstreamResponse};

/// Fixed diagnostic for a successful caption response with no caption in it.
pub const NO_CAPTION: &str = "No caption found";
/// Fixed diagnostic for a successful response that is not JSON.
pub const NOT_JSON: &str = "Upstream response is not valid JSON";
/// Body sent for faults whose details must stay server-side.
pub const INTERNAL: &str = "Internal server error";

/// Everything that can go wrong between a capability endpoint and an upstream.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The caller named a provider the registry doesn't know.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The provider exists but has no route for this capability.
    #[error("provider {provider} does not support {capability}")]
    UnsupportedCapability {
        provider: &'static str,
        capability: Capability,
    },

    /// The provider requires a key and none could be resolved.
    #[error("no credential available for {0}")]
    MissingCredential(&'static str),

    /// The caller's request can't be turned into an upstream call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    UpstreamRejected { status: u16, body: String },

    /// Upstream answered 2xx but without the data the extractor needs.
    #[error("{0}")]
    UpstreamMalformed(&'static str),

    /// Network-level failure reaching upstream.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local I/O failure (temporary upload handling).
    #[error("local I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status returned to the caller.
    pub fn caller_status(&self) -> u16 {
        match self {
            GatewayError::UnknownProvider(_)
            | GatewayError::UnsupportedCapability { .. }
            | GatewayError::MissingCredential(_)
            | GatewayError::InvalidRequest(_) => 400,
            GatewayError::UpstreamRejected { .. }
            | GatewayError::UpstreamMalformed(_)
            | GatewayError::Transport(_)
            | GatewayError::Io(_) => 500,
        }
    }

    /// Body returned to the caller.
    ///
    /// Upstream error text is forwarded verbatim; transport and I/O details
    /// (which may contain URLs or paths) are not.
    pub fn caller_body(&self) -> String {
        match self {
            GatewayError::MissingCredential(_) => String::new(),
            GatewayError::UnknownProvider(_)
            | GatewayError::UnsupportedCapability { .. }
            | GatewayError::InvalidRequest(_) => self.to_string(),
            GatewayError::UpstreamRejected { body, .. } => body.clone(),
            GatewayError::UpstreamMalformed(message) => (*message).to_string(),
            GatewayError::Transport(_) | GatewayError::Io(_) => INTERNAL.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.caller_status() < 500
    }
}

/// Classify a raw upstream response: non-success becomes `UpstreamRejected`.
pub fn check_status(raw: RawUpstreamResponse) -> Result<RawUpstreamResponse, GatewayError> {
    if raw.is_success() {
        Ok(raw)
    } else {
        Err(GatewayError::UpstreamRejected {
            status: raw.status,
            body: String::from_utf8_lossy(&raw.body).into_owned(),
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn raw(status: u16, body: &'static str) -> RawUpstreamResponse {
        RawUpstreamResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_check_status_success_passes_through() {
        let ok = check_status(raw(200, "{}")).unwrap();
        assert_eq!(ok.status, 200);
    }

    #[test]
    fn test_upstream_500_forwards_body_verbatim() {
        let err = check_status(raw(500, "rate limited")).unwrap_err();
        assert_eq!(err.caller_status(), 500);
        assert_eq!(err.caller_body(), "rate limited");
    }

    #[test]
    fn test_upstream_4xx_is_still_a_server_error() {
        let err = check_status(raw(401, "{\"error\":\"bad key\"}")).unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamRejected { status: 401, .. }));
        assert_eq!(err.caller_status(), 500);
        assert_eq!(err.caller_body(), "{\"error\":\"bad key\"}");
    }

    #[test]
    fn test_missing_credential_has_empty_body() {
        let err = GatewayError::MissingCredential("openai");
        assert_eq!(err.caller_status(), 400);
        assert!(err.caller_body().is_empty());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_provider_is_client_error() {
        let err = GatewayError::UnknownProvider("skynet".to_string());
        assert_eq!(err.caller_status(), 400);
        assert_eq!(err.caller_body(), "unknown provider: skynet");
    }

    #[test]
    fn test_malformed_uses_fixed_message() {
        let err = GatewayError::UpstreamMalformed(NO_CAPTION);
        assert_eq!(err.caller_status(), 500);
        assert_eq!(err.caller_body(), "No caption found");
    }

    #[test]
    fn test_io_details_are_not_forwarded() {
        let err = GatewayError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/var/secret/path",
        ));
        assert_eq!(err.caller_status(), 500);
        assert_eq!(err.caller_body(), INTERNAL);
    }
}
