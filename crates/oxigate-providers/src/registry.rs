//! Provider registry: static profiles for every supported upstream.
//!
//! Each `ProviderProfile` describes how to talk to one provider: how it
//! authenticates, whether a key is mandatory, and one [`Route`] per
//! capability it serves. Everything provider-specific lives in this table;
//! the normalizer and dispatcher never branch on a provider id.

use oxigate_core::secrets::keys;

use crate::error::GatewayError;
use crate::request::{Capability, Verb};
use crate::transform::Transform;

// ─────────────────────────────────────────────
// Profile shape
// ─────────────────────────────────────────────

/// How the credential is presented upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <credential>`.
    Bearer,
    /// No credential is ever sent.
    None,
}

/// Where a route's URL comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Provider base + path. The base may be replaced by an operator
    /// `apiBase` or, for reverse-proxy profiles, by the caller's proxy.
    Fixed {
        base: &'static str,
        path: &'static str,
    },
    /// Caller `server_url` + path, optionally with a trailing `/v1` trimmed first.
    Server { path: &'static str, trim_v1: bool },
    /// The caller's `provider_endpoint`, used as-is.
    Caller,
}

/// How a successful upstream response becomes a capability output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extractor {
    /// `choices[0].message.content`.
    ChatCaption,
    /// `message.content[0].text` (Cohere v2).
    CohereCaption,
    /// Raw bytes with the upstream content type.
    Audio,
    /// Upstream JSON unchanged.
    Json,
    /// The upstream `data` array, or `[]`.
    ModelList,
}

/// One capability served by one profile.
#[derive(Clone, Copy, Debug)]
pub struct Route {
    pub capability: Capability,
    pub verb: Verb,
    pub endpoint: Endpoint,
    /// Secret-store key holding this route's credential.
    pub secret: Option<&'static str>,
    /// Ordered request transforms, in phase order.
    pub pipeline: &'static [Transform],
    pub extractor: Extractor,
}

/// Static description of one upstream provider.
#[derive(Clone, Copy, Debug)]
pub struct ProviderProfile {
    /// Identifier callers select the provider by (the `api` field).
    pub id: &'static str,
    /// Human-readable name for logs and `oxigate status`.
    pub display_name: &'static str,
    pub auth: AuthStyle,
    /// Whether a missing credential rejects the request.
    pub requires_key: bool,
    /// Whether a caller `reverse_proxy` replaces the base URL and credential.
    pub reverse_proxy: bool,
    pub routes: &'static [Route],
}

impl ProviderProfile {
    /// The route serving `capability`, or `UnsupportedCapability`.
    pub fn route(&self, capability: Capability) -> Result<&'static Route, GatewayError> {
        self.routes
            .iter()
            .find(|r| r.capability == capability)
            .ok_or(GatewayError::UnsupportedCapability {
                provider: self.id,
                capability,
            })
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.routes.iter().any(|r| r.capability == capability)
    }
}

// ─────────────────────────────────────────────
// Pipelines
// ─────────────────────────────────────────────

/// Attribution headers some aggregators ask clients to send.
const ATTRIBUTION: &[(&str, &str)] = &[("HTTP-Referer", "http://localhost"), ("X-Title", "Oxigate")];

const PLAIN: &[Transform] = &[
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::ConfigExclusions,
];

const ATTRIBUTED: &[Transform] = &[
    Transform::Headers(ATTRIBUTION),
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::ConfigExclusions,
];

const GROQ_CHAT: &[Transform] = &[
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::DemoteSystemTurns,
    Transform::ConfigExclusions,
];

const CUSTOM_CHAT: &[Transform] = &[
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::CallerBody,
    Transform::CallerHeaders,
    Transform::ConfigExclusions,
    Transform::CallerExclusions,
];

const OOBA_CHAT: &[Transform] = &[
    Transform::Set {
        field: "temperature",
        value: 0.1,
    },
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::DetachImage,
    Transform::ConfigExclusions,
];

const PASS_THROUGH_SPEECH: &[Transform] = &[
    Transform::ConfigHeaders,
    Transform::ConfigDefaults,
    Transform::PassThroughExtras,
    Transform::ConfigExclusions,
];

// ─────────────────────────────────────────────
// Route helpers
// ─────────────────────────────────────────────

const fn fixed_post(
    capability: Capability,
    base: &'static str,
    path: &'static str,
    secret: Option<&'static str>,
    pipeline: &'static [Transform],
    extractor: Extractor,
) -> Route {
    Route {
        capability,
        verb: Verb::Post,
        endpoint: Endpoint::Fixed { base, path },
        secret,
        pipeline,
        extractor,
    }
}

const fn fixed_caption(base: &'static str, secret: &'static str, pipeline: &'static [Transform]) -> Route {
    fixed_post(
        Capability::Caption,
        base,
        "/chat/completions",
        Some(secret),
        pipeline,
        Extractor::ChatCaption,
    )
}

const fn local_caption(secret: &'static str, pipeline: &'static [Transform]) -> Route {
    Route {
        capability: Capability::Caption,
        verb: Verb::Post,
        endpoint: Endpoint::Server {
            path: "/v1/chat/completions",
            trim_v1: true,
        },
        secret: Some(secret),
        pipeline,
        extractor: Extractor::ChatCaption,
    }
}

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const GROQ_BASE: &str = "https://api.groq.com/openai/v1";
const ELECTRONHUB_BASE: &str = "https://api.electronhub.ai/v1";

// ─────────────────────────────────────────────
// All providers
// ─────────────────────────────────────────────

/// Complete list of supported provider profiles.
pub static PROVIDERS: &[ProviderProfile] = &[
    // 1. OpenAI: every capability except model listing
    ProviderProfile {
        id: "openai",
        display_name: "OpenAI",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: true,
        routes: &[
            fixed_caption(OPENAI_BASE, keys::OPENAI, PLAIN),
            fixed_post(
                Capability::Transcription,
                OPENAI_BASE,
                "/audio/transcriptions",
                Some(keys::OPENAI),
                PLAIN,
                Extractor::Json,
            ),
            fixed_post(
                Capability::Speech,
                OPENAI_BASE,
                "/audio/speech",
                Some(keys::OPENAI),
                PLAIN,
                Extractor::Audio,
            ),
            fixed_post(
                Capability::ImageGeneration,
                OPENAI_BASE,
                "/images/generations",
                Some(keys::OPENAI),
                PLAIN,
                Extractor::Json,
            ),
        ],
    },
    // 2. OpenRouter: aggregator, wants attribution headers
    ProviderProfile {
        id: "openrouter",
        display_name: "OpenRouter",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: true,
        routes: &[fixed_caption("https://openrouter.ai/api/v1", keys::OPENROUTER, ATTRIBUTED)],
    },
    // 3. xAI
    ProviderProfile {
        id: "xai",
        display_name: "xAI",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: true,
        routes: &[fixed_caption("https://api.x.ai/v1", keys::XAI, PLAIN)],
    },
    // 4. Mistral
    ProviderProfile {
        id: "mistral",
        display_name: "Mistral AI",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: true,
        routes: &[fixed_caption("https://api.mistral.ai/v1", keys::MISTRALAI, PLAIN)],
    },
    // 5. Groq: rejects system turns; also serves Whisper transcription
    ProviderProfile {
        id: "groq",
        display_name: "Groq",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[
            fixed_caption(GROQ_BASE, keys::GROQ, GROQ_CHAT),
            fixed_post(
                Capability::Transcription,
                GROQ_BASE,
                "/audio/transcriptions",
                Some(keys::GROQ),
                PLAIN,
                Extractor::Json,
            ),
        ],
    },
    // 6. Cohere: v2 chat envelope
    ProviderProfile {
        id: "cohere",
        display_name: "Cohere",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[fixed_post(
            Capability::Caption,
            "https://api.cohere.ai/v2",
            "/chat",
            Some(keys::COHERE),
            PLAIN,
            Extractor::CohereCaption,
        )],
    },
    // 7. AI/ML API: aggregator, wants attribution headers
    ProviderProfile {
        id: "aimlapi",
        display_name: "AI/ML API",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[fixed_caption("https://api.aimlapi.com/v1", keys::AIMLAPI, ATTRIBUTED)],
    },
    // 8. Moonshot (Kimi)
    ProviderProfile {
        id: "moonshot",
        display_name: "Moonshot",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[fixed_caption("https://api.moonshot.ai/v1", keys::MOONSHOT, PLAIN)],
    },
    // 9. NanoGPT
    ProviderProfile {
        id: "nanogpt",
        display_name: "NanoGPT",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[fixed_caption("https://nano-gpt.com/api/v1", keys::NANOGPT, PLAIN)],
    },
    // 10. Electron Hub: caption, speech with extra-field passthrough, model listing
    ProviderProfile {
        id: "electronhub",
        display_name: "Electron Hub",
        auth: AuthStyle::Bearer,
        requires_key: true,
        reverse_proxy: false,
        routes: &[
            fixed_caption(ELECTRONHUB_BASE, keys::ELECTRONHUB, PLAIN),
            fixed_post(
                Capability::Speech,
                ELECTRONHUB_BASE,
                "/audio/speech",
                Some(keys::ELECTRONHUB),
                PASS_THROUGH_SPEECH,
                Extractor::Audio,
            ),
            Route {
                capability: Capability::ModelList,
                verb: Verb::Get,
                endpoint: Endpoint::Fixed {
                    base: ELECTRONHUB_BASE,
                    path: "/models",
                },
                secret: Some(keys::ELECTRONHUB),
                pipeline: PLAIN,
                extractor: Extractor::ModelList,
            },
        ],
    },
    // 11. Pollinations: anonymous
    ProviderProfile {
        id: "pollinations",
        display_name: "Pollinations",
        auth: AuthStyle::None,
        requires_key: false,
        reverse_proxy: false,
        routes: &[fixed_post(
            Capability::Caption,
            "https://text.pollinations.ai/openai",
            "/chat/completions",
            None,
            PLAIN,
            Extractor::ChatCaption,
        )],
    },
    // 12. Custom: caller-hosted OpenAI-compatible server
    ProviderProfile {
        id: "custom",
        display_name: "Custom (OpenAI-compatible)",
        auth: AuthStyle::Bearer,
        requires_key: false,
        reverse_proxy: false,
        routes: &[
            Route {
                capability: Capability::Caption,
                verb: Verb::Post,
                endpoint: Endpoint::Server {
                    path: "/chat/completions",
                    trim_v1: false,
                },
                secret: Some(keys::CUSTOM),
                pipeline: CUSTOM_CHAT,
                extractor: Extractor::ChatCaption,
            },
            Route {
                capability: Capability::Speech,
                verb: Verb::Post,
                endpoint: Endpoint::Caller,
                secret: Some(keys::CUSTOM_OPENAI_TTS),
                pipeline: PLAIN,
                extractor: Extractor::Audio,
            },
        ],
    },
    // 13. Text Generation WebUI: image goes in a sibling field
    ProviderProfile {
        id: "ooba",
        display_name: "Text Generation WebUI",
        auth: AuthStyle::Bearer,
        requires_key: false,
        reverse_proxy: false,
        routes: &[local_caption(keys::OOBA, OOBA_CHAT)],
    },
    // 14. KoboldCpp
    ProviderProfile {
        id: "koboldcpp",
        display_name: "KoboldCpp",
        auth: AuthStyle::Bearer,
        requires_key: false,
        reverse_proxy: false,
        routes: &[local_caption(keys::KOBOLDCPP, PLAIN)],
    },
    // 15. llama.cpp server
    ProviderProfile {
        id: "llamacpp",
        display_name: "llama.cpp",
        auth: AuthStyle::Bearer,
        requires_key: false,
        reverse_proxy: false,
        routes: &[local_caption(keys::LLAMACPP, PLAIN)],
    },
    // 16. vLLM
    ProviderProfile {
        id: "vllm",
        display_name: "vLLM",
        auth: AuthStyle::Bearer,
        requires_key: false,
        reverse_proxy: false,
        routes: &[local_caption(keys::VLLM, PLAIN)],
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider profile by exact id.
pub fn find_by_name(id: &str) -> Result<&'static ProviderProfile, GatewayError> {
    PROVIDERS
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| GatewayError::UnknownProvider(id.to_string()))
}

/// Every profile that serves `capability`.
pub fn supporting(capability: Capability) -> impl Iterator<Item = &'static ProviderProfile> {
    PROVIDERS.iter().filter(move |p| p.supports(capability))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
