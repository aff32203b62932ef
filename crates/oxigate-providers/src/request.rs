//! Request-side value types: what the caller asked for, what goes upstream,
//! and what comes back.
//!
//! A [`CanonicalRequest`] is built by a capability endpoint, consumed by the
//! normalizer into an [`UpstreamCall`], which the dispatcher consumes into a
//! [`RawUpstreamResponse`]. None of them outlive the request that made them.

use std::fmt;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use crate::upload::AudioUpload;

// ─────────────────────────────────────────────
// Capability
// ─────────────────────────────────────────────

/// The operations the gateway exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Caption,
    Transcription,
    Speech,
    ImageGeneration,
    ModelList,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Caption => "caption",
            Capability::Transcription => "transcription",
            Capability::Speech => "speech",
            Capability::ImageGeneration => "image generation",
            Capability::ModelList => "model listing",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// CanonicalRequest
// ─────────────────────────────────────────────

/// Where the caller wants the call to go, when it isn't a fixed URL.
#[derive(Clone, Debug, Default)]
pub struct Target {
    /// Reverse-proxy base URL replacing the provider's own base.
    pub reverse_proxy: Option<String>,
    /// Password for the reverse proxy, sent in place of a stored key.
    pub proxy_password: Option<String>,
    /// Base URL of a custom or self-hosted server.
    pub server_url: Option<String>,
    /// Complete endpoint URL (custom speech).
    pub provider_endpoint: Option<String>,
}

/// Caller-supplied YAML directives for the `custom` provider.
#[derive(Clone, Debug, Default)]
pub struct CustomDirectives {
    /// YAML object (or list of objects) merged into the body.
    pub include_body: Option<String>,
    /// YAML object (or list of objects) merged into the headers.
    pub include_headers: Option<String>,
    /// YAML key, list of keys, or object whose keys are removed from the body.
    pub exclude_body: Option<String>,
}

/// Binary or structured input that isn't a plain parameter.
#[derive(Debug, Default)]
pub enum Payload {
    #[default]
    None,
    /// Image as a URL or data URI (captioning).
    Image(String),
    /// Uploaded audio file (transcription).
    Audio(AudioUpload),
    /// Caller object forwarded verbatim (image generation).
    Verbatim(Map<String, Value>),
}

/// Provider-agnostic input to one capability call.
#[derive(Debug)]
pub struct CanonicalRequest {
    pub capability: Capability,
    pub model: Option<String>,
    /// Caption prompt or text to speak.
    pub prompt: Option<String>,
    pub payload: Payload,
    /// Known capability parameters, capability defaults already applied.
    pub params: Map<String, Value>,
    /// Caller fields outside the capability's known-fields set.
    pub extras: Map<String, Value>,
    pub target: Target,
    pub custom: CustomDirectives,
}

impl CanonicalRequest {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            model: None,
            prompt: None,
            payload: Payload::None,
            params: Map::new(),
            extras: Map::new(),
            target: Target::default(),
            custom: CustomDirectives::default(),
        }
    }
}

// ─────────────────────────────────────────────
// UpstreamCall
// ─────────────────────────────────────────────

/// HTTP verb of an upstream call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

/// Body of an upstream call.
#[derive(Debug)]
pub enum UpstreamBody {
    Empty,
    Json(Map<String, Value>),
    /// Form fields plus the audio file; the file is released after sending.
    Multipart {
        fields: Map<String, Value>,
        audio: AudioUpload,
    },
}

impl UpstreamBody {
    /// The JSON object or form fields, if any.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            UpstreamBody::Empty => None,
            UpstreamBody::Json(map) => Some(map),
            UpstreamBody::Multipart { fields, .. } => Some(fields),
        }
    }
}

/// A fully resolved upstream request, owned by the dispatcher for one round trip.
#[derive(Debug)]
pub struct UpstreamCall {
    pub provider: &'static str,
    pub capability: Capability,
    pub verb: Verb,
    pub url: String,
    pub headers: HeaderMap,
    pub body: UpstreamBody,
}

// ─────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────

/// What the upstream sent back, before any interpretation.
#[derive(Clone, Debug)]
pub struct RawUpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawUpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The canonical result of a capability call.
#[derive(Clone, Debug, PartialEq)]
pub enum CapabilityOutput {
    Caption(String),
    Audio { content_type: String, bytes: Bytes },
    Json(Value),
}
