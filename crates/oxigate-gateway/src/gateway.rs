//! Capability endpoints: the shared sequence every operation runs.
//!
//! find profile → pick route → resolve credential (reject early) →
//! normalize → dispatch → extract. The operations below differ only in how
//! they build the canonical request and which output shape they return.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use oxigate_core::config::Config;
use oxigate_core::headers::{ConfigHeaderPolicy, HeaderPolicy};
use oxigate_core::secrets::{FileSecretStore, SecretStore, UserScope};
use oxigate_core::utils::expand_home;
use oxigate_providers::error::INTERNAL;
use oxigate_providers::extract::extract;
use oxigate_providers::{
    credential, find_by_name, normalizer, CanonicalRequest, CapabilityOutput, Dispatch,
    GatewayError, HttpDispatcher, NormalizeContext,
};

use crate::api::{self, CaptionRequest, SpeechVariant, TranscriptionRequest};

/// Synthesized speech, ready to return to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeechAudio {
    pub content_type: String,
    pub bytes: Bytes,
}

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct Gateway {
    /// Loaded configuration (immutable after startup).
    pub config: Arc<Config>,
    pub secrets: Arc<dyn SecretStore>,
    pub header_policy: Arc<dyn HeaderPolicy>,
    pub dispatcher: Arc<dyn Dispatch>,
}

impl Gateway {
    pub fn new(
        config: Config,
        secrets: Arc<dyn SecretStore>,
        header_policy: Arc<dyn HeaderPolicy>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            secrets,
            header_policy,
            dispatcher,
        }
    }

    /// Production wiring: file secrets, config header rules, `reqwest` dispatcher.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let secrets = FileSecretStore::new(expand_home(&config.secrets.root));
        let policy = ConfigHeaderPolicy::new(config.additional_headers.clone());
        let dispatcher = HttpDispatcher::new(Duration::from_secs(config.gateway.timeout_secs))?;
        debug!(secrets = %secrets.root().display(), "gateway wired");
        Ok(Self::new(
            config,
            Arc::new(secrets),
            Arc::new(policy),
            Arc::new(dispatcher),
        ))
    }

    /// Directory for temporary uploads (`None` = system temp dir).
    pub fn upload_dir(&self) -> Option<PathBuf> {
        self.config
            .gateway
            .upload_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(expand_home)
    }

    /// The user a request acts for: the header value, else the configured default.
    pub fn user_scope(&self, header: Option<&str>) -> UserScope {
        let name = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(self.config.gateway.default_user.as_str());
        UserScope::new(name)
    }

    /// Run one capability call against `provider`.
    pub async fn execute(
        &self,
        provider: &str,
        request: CanonicalRequest,
        user: &UserScope,
    ) -> Result<CapabilityOutput, GatewayError> {
        let profile = find_by_name(provider)?;
        let route = profile.route(request.capability)?;
        let credential =
            credential::resolve(profile, route, &request.target, user, self.secrets.as_ref())?;

        let ctx = NormalizeContext {
            config: &self.config,
            header_policy: self.header_policy.as_ref(),
        };
        let call = normalizer::build(request, profile, route, credential.as_ref(), &ctx)?;
        let raw = self.dispatcher.send(call).await?;
        extract(route.extractor, raw)
    }

    // ─────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────

    /// Caption an image; returns the caption text.
    pub async fn caption_image(
        &self,
        user: &UserScope,
        request: CaptionRequest,
    ) -> Result<String, GatewayError> {
        let (provider, canonical) = request.into_canonical();
        info!(provider = %provider, user = user.name(), "captioning image");
        match self.execute(&provider, canonical, user).await? {
            CapabilityOutput::Caption(caption) => Ok(caption),
            other => Err(unexpected(other)),
        }
    }

    /// Transcribe an uploaded clip; returns the upstream JSON unchanged.
    pub async fn transcribe_audio(
        &self,
        user: &UserScope,
        request: TranscriptionRequest,
    ) -> Result<Value, GatewayError> {
        let (provider, canonical) = request.into_canonical();
        info!(provider = %provider, user = user.name(), "transcribing audio");
        json_output(self.execute(&provider, canonical, user).await?)
    }

    /// Synthesize speech through one of the speech variants.
    pub async fn synthesize_speech(
        &self,
        user: &UserScope,
        variant: SpeechVariant,
        body: Map<String, Value>,
    ) -> Result<SpeechAudio, GatewayError> {
        let provider = variant.provider();
        info!(provider, user = user.name(), "synthesizing speech");
        match self
            .execute(provider, api::speech_request(variant, body), user)
            .await?
        {
            CapabilityOutput::Audio {
                content_type,
                bytes,
            } => Ok(SpeechAudio {
                content_type,
                bytes,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Generate images (OpenAI); returns the upstream JSON unchanged.
    pub async fn generate_image(
        &self,
        user: &UserScope,
        body: Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        info!(user = user.name(), "generating image");
        json_output(self.execute("openai", api::image_request(body), user).await?)
    }

    /// List ElectronHub models; returns the `data` array or `[]`.
    pub async fn list_models(&self, user: &UserScope) -> Result<Value, GatewayError> {
        debug!(user = user.name(), "listing electronhub models");
        json_output(
            self.execute("electronhub", api::model_list_request(), user)
                .await?,
        )
    }
}

fn json_output(output: CapabilityOutput) -> Result<Value, GatewayError> {
    match output {
        CapabilityOutput::Json(value) => Ok(value),
        other => Err(unexpected(other)),
    }
}

fn unexpected(output: CapabilityOutput) -> GatewayError {
    error!(output = ?output, "route produced the wrong output shape");
    GatewayError::UpstreamMalformed(INTERNAL)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
