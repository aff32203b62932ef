//! Request normalizer: turns a canonical request plus a provider route into
//! the exact upstream call (URL, headers, body).
//!
//! Steps, in order:
//! 1. Resolve the URL (fails fast on a missing caller server or endpoint)
//! 2. Build the capability's base body; captioning prepends the system prompt
//! 3. Run the route's transform pipeline
//! 4. Attach headers: content type, credential, pipeline headers, then policy headers

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};
use tracing::debug;

use oxigate_core::config::{Config, ProviderConfig};
use oxigate_core::headers::HeaderPolicy;
use oxigate_core::types::{ChatCompletionRequest, Message};
use oxigate_core::utils::{join_url, trim_v1};

use crate::credential::{uses_reverse_proxy, Credential};
use crate::error::GatewayError;
use crate::registry::{AuthStyle, Endpoint, ProviderProfile, Route};
use crate::request::{CanonicalRequest, Capability, Payload, Target, UpstreamBody, UpstreamCall};
use crate::transform::{insert_header, run_pipeline, Draft, TransformContext};
use crate::upload::AudioUpload;

/// Process-wide inputs to every build.
#[derive(Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub config: &'a Config,
    pub header_policy: &'a dyn HeaderPolicy,
}

/// Build the upstream call for `request` on `route` of `profile`.
pub fn build(
    request: CanonicalRequest,
    profile: &'static ProviderProfile,
    route: &'static Route,
    credential: Option<&Credential>,
    ctx: &NormalizeContext<'_>,
) -> Result<UpstreamCall, GatewayError> {
    let overrides = ctx.config.provider(profile.id);
    let url = resolve_url(profile, route, &request.target, overrides)?;

    let CanonicalRequest {
        capability,
        model,
        prompt,
        payload,
        params,
        extras,
        target: _,
        custom,
    } = request;

    let (base, audio) = base_body(capability, model, prompt, payload, params, ctx.config)?;

    let mut draft = Draft::new(base);
    let transform_ctx = TransformContext {
        overrides,
        extras: &extras,
        custom: &custom,
    };
    run_pipeline(route.pipeline, &mut draft, &transform_ctx);

    let body = match (capability, audio) {
        (Capability::ModelList, _) => UpstreamBody::Empty,
        (_, Some(audio)) => UpstreamBody::Multipart {
            fields: draft.body,
            audio,
        },
        (_, None) => UpstreamBody::Json(draft.body),
    };

    let mut headers = HeaderMap::new();
    if matches!(body, UpstreamBody::Json(_)) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    if let (AuthStyle::Bearer, Some(credential)) = (profile.auth, credential) {
        match HeaderValue::from_str(&format!("Bearer {}", credential.token())) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                return Err(GatewayError::InvalidRequest(
                    "credential contains characters not allowed in a header".to_string(),
                ))
            }
        }
    }
    for (name, value) in draft.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }
    for (name, value) in ctx.header_policy.headers_for(&url) {
        insert_header(&mut headers, &name, &value);
    }

    debug!(
        provider = profile.id,
        capability = %capability,
        url = %url,
        body = ?body.fields(),
        "upstream call built"
    );

    Ok(UpstreamCall {
        provider: profile.id,
        capability,
        verb: route.verb,
        url,
        headers,
        body,
    })
}

/// The fully qualified upstream URL for `route`.
pub fn resolve_url(
    profile: &ProviderProfile,
    route: &Route,
    target: &Target,
    overrides: Option<&ProviderConfig>,
) -> Result<String, GatewayError> {
    match route.endpoint {
        Endpoint::Fixed { base, path } => {
            let base = if uses_reverse_proxy(profile, target) {
                target.reverse_proxy.as_deref().unwrap_or(base)
            } else {
                overrides
                    .and_then(|o| o.api_base.as_deref())
                    .filter(|b| !b.trim().is_empty())
                    .unwrap_or(base)
            };
            Ok(join_url(base, path))
        }
        Endpoint::Server { path, trim_v1: trim } => {
            let server = required(target.server_url.as_deref(), "server_url", profile.id)?;
            let base = if trim { trim_v1(server) } else { server };
            Ok(join_url(base, path))
        }
        Endpoint::Caller => {
            required(target.provider_endpoint.as_deref(), "provider_endpoint", profile.id)
                .map(str::to_string)
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str, provider: &str) -> Result<&'a str, GatewayError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest(format!("{field} is required for {provider}")))
}

/// Capability base body, plus the audio file for multipart calls.
fn base_body(
    capability: Capability,
    model: Option<String>,
    prompt: Option<String>,
    payload: Payload,
    params: Map<String, Value>,
    config: &Config,
) -> Result<(Map<String, Value>, Option<AudioUpload>), GatewayError> {
    match capability {
        Capability::Caption => {
            let Payload::Image(image) = payload else {
                return Err(GatewayError::InvalidRequest("image is required".to_string()));
            };
            let mut messages = Vec::with_capacity(2);
            if let Some(system) = config.caption.system_prompt() {
                messages.push(Message::system(system));
            }
            messages.push(Message::caption_turn(prompt.unwrap_or_default(), image));

            let chat = ChatCompletionRequest { model, messages };
            let mut body = match serde_json::to_value(chat) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            };
            body.extend(params);
            Ok((body, None))
        }
        Capability::Speech => {
            let mut body = Map::new();
            if let Some(input) = prompt {
                body.insert("input".to_string(), Value::from(input));
            }
            if let Some(model) = model {
                body.insert("model".to_string(), Value::from(model));
            }
            body.extend(params);
            Ok((body, None))
        }
        Capability::Transcription => {
            let Payload::Audio(audio) = payload else {
                return Err(GatewayError::InvalidRequest("audio file is required".to_string()));
            };
            let mut fields = Map::new();
            if let Some(model) = model {
                fields.insert("model".to_string(), Value::from(model));
            }
            fields.extend(params);
            Ok((fields, Some(audio)))
        }
        Capability::ImageGeneration => match payload {
            Payload::Verbatim(body) => Ok((body, None)),
            _ => Err(GatewayError::InvalidRequest(
                "image generation needs a JSON object body".to_string(),
            )),
        },
        Capability::ModelList => Ok((Map::new(), None)),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{find_by_name, PROVIDERS};
    use crate::request::CustomDirectives;
    use oxigate_core::config::HeaderRule;
    use oxigate_core::headers::{ConfigHeaderPolicy, NoExtraHeaders};
    use serde_json::json;
    use std::collections::HashMap;

    const IMAGE: &str = "data:image/png;base64,AAAA";

    fn config_with_prompt(prompt: &str) -> Config {
        let mut config = Config::default();
        config.caption.system_prompt = prompt.to_string();
        config
    }

    fn caller_target() -> Target {
        Target {
            server_url: Some("http://127.0.0.1:5000/".to_string()),
            provider_endpoint: Some("http://tts.local/v1/audio/speech".to_string()),
            ..Default::default()
        }
    }

    fn sample_request(capability: Capability, upload_dir: &std::path::Path) -> CanonicalRequest {
        let mut request = CanonicalRequest::new(capability);
        request.model = Some("some-model".to_string());
        request.target = caller_target();
        match capability {
            Capability::Caption => {
                request.prompt = Some("Describe this".to_string());
                request.payload = Payload::Image(IMAGE.to_string());
            }
            Capability::Speech => {
                request.prompt = Some("hello".to_string());
                request.params = json!({ "voice": "alloy", "speed": 1, "response_format": "mp3" })
                    .as_object()
                    .unwrap()
                    .clone();
            }
            Capability::Transcription => {
                request.payload =
                    Payload::Audio(AudioUpload::persist(Some(upload_dir), b"RIFF").unwrap());
                request.params = json!({ "language": "en" }).as_object().unwrap().clone();
            }
            Capability::ImageGeneration => {
                request.payload = Payload::Verbatim(
                    json!({ "prompt": "a cat", "model": "dall-e-3", "n": 1 })
                        .as_object()
                        .unwrap()
                        .clone(),
                );
            }
            Capability::ModelList => {}
        }
        request
    }

    fn build_for(
        id: &str,
        request: CanonicalRequest,
        credential: Option<&Credential>,
        config: &Config,
    ) -> Result<UpstreamCall, GatewayError> {
        let profile = find_by_name(id).unwrap();
        let route = profile.route(request.capability).unwrap();
        let ctx = NormalizeContext {
            config,
            header_policy: &NoExtraHeaders,
        };
        build(request, profile, route, credential, &ctx)
    }

    fn json_body(call: &UpstreamCall) -> &Map<String, Value> {
        match &call.body {
            UpstreamBody::Json(map) => map,
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    // ── Exclusions ──

    #[test]
    fn test_excluded_fields_never_reach_any_route() {
        let dir = tempfile::tempdir().unwrap();
        let excluded = ["model", "temperature", "voice", "speed", "language", "n", "max_tokens"];

        for profile in PROVIDERS {
            let mut config = config_with_prompt("sys");
            config.providers.insert(
                profile.id.to_string(),
                ProviderConfig {
                    defaults: json!({ "max_tokens": 300 }).as_object().unwrap().clone(),
                    exclude_body: excluded.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                },
            );
            for route in profile.routes {
                let mut request = sample_request(route.capability, dir.path());
                request.extras = json!({ "temperature": 0.4 }).as_object().unwrap().clone();
                let call = build_for(profile.id, request, None, &config).unwrap();
                if let Some(fields) = call.body.fields() {
                    for field in excluded {
                        assert!(
                            !fields.contains_key(field),
                            "{} {} sent excluded field {field}",
                            profile.id,
                            route.capability
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_caller_exclusions_apply_after_caller_includes() {
        let mut request = sample_request(Capability::Caption, std::env::temp_dir().as_path());
        request.custom = CustomDirectives {
            include_body: Some("top_p: 0.9\nmax_tokens: 50".to_string()),
            exclude_body: Some("- max_tokens".to_string()),
            ..Default::default()
        };
        let call = build_for("custom", request, None, &Config::default()).unwrap();
        let body = json_body(&call);
        assert_eq!(body["top_p"], 0.9);
        assert!(!body.contains_key("max_tokens"));
    }

    // ── System prompt ──

    #[test]
    fn test_system_prompt_precedes_user_turn() {
        let config = config_with_prompt("You write alt text.");
        let dir = tempfile::tempdir().unwrap();
        for profile in PROVIDERS.iter().filter(|p| p.id != "groq") {
            let call = build_for(
                profile.id,
                sample_request(Capability::Caption, dir.path()),
                None,
                &config,
            )
            .unwrap();
            let messages = json_body(&call)["messages"].as_array().unwrap();
            assert_eq!(messages[0]["role"], "system", "{}", profile.id);
            assert_eq!(messages[0]["content"], "You write alt text.");
            assert_eq!(messages[1]["role"], "user", "{}", profile.id);
        }
    }

    #[test]
    fn test_blank_system_prompt_is_omitted() {
        let config = config_with_prompt("   ");
        let dir = tempfile::tempdir().unwrap();
        let call = build_for("openai", sample_request(Capability::Caption, dir.path()), None, &config)
            .unwrap();
        let messages = json_body(&call)["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_groq_caption_has_no_system_turn() {
        let config = config_with_prompt("SYS");
        let dir = tempfile::tempdir().unwrap();
        let call =
            build_for("groq", sample_request(Capability::Caption, dir.path()), None, &config).unwrap();
        let messages = json_body(&call)["messages"].as_array().unwrap();

        assert!(messages.iter().all(|m| m["role"] != "system"));
        assert_eq!(messages[0]["role"], "user");
        let text = messages[0]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("SYS"));
        assert!(text.ends_with("Describe this"));
        assert_eq!(messages[0]["content"][1]["type"], "image_url");
        assert_eq!(messages[0]["content"][1]["image_url"]["url"], IMAGE);
    }

    #[test]
    fn test_ooba_detaches_image_and_pins_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "ooba",
            sample_request(Capability::Caption, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        let body = json_body(&call);
        assert_eq!(body["temperature"], 0.1);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "Describe this");
        assert_eq!(messages[1]["content"], json!([]));
        assert_eq!(messages[1]["image_url"], IMAGE);
    }

    // ── URLs ──

    #[test]
    fn test_custom_url_has_single_seam() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Caption, dir.path());
        request.target.server_url = Some("http://10.0.0.2:8080/v1/".to_string());
        let call = build_for("custom", request, None, &Config::default()).unwrap();
        assert_eq!(call.url, "http://10.0.0.2:8080/v1/chat/completions");
    }

    #[test]
    fn test_reverse_proxy_url_has_single_seam() {
        let dir = tempfile::tempdir().unwrap();
        for base in ["https://proxy.local/v1", "https://proxy.local/v1/"] {
            let mut request = sample_request(Capability::Caption, dir.path());
            request.target.reverse_proxy = Some(base.to_string());
            let call = build_for("openrouter", request, None, &Config::default()).unwrap();
            assert_eq!(call.url, "https://proxy.local/v1/chat/completions");
        }
    }

    #[test]
    fn test_local_runtime_trims_v1() {
        let dir = tempfile::tempdir().unwrap();
        for server in ["http://127.0.0.1:5000", "http://127.0.0.1:5000/v1", "http://127.0.0.1:5000/v1/"] {
            let mut request = sample_request(Capability::Caption, dir.path());
            request.target.server_url = Some(server.to_string());
            let call = build_for("vllm", request, None, &Config::default()).unwrap();
            assert_eq!(call.url, "http://127.0.0.1:5000/v1/chat/completions");
        }
    }

    #[test]
    fn test_missing_server_url_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Caption, dir.path());
        request.target.server_url = None;
        let err = build_for("koboldcpp", request, None, &Config::default()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn test_custom_speech_without_endpoint_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Speech, dir.path());
        request.target.provider_endpoint = Some("  ".to_string());
        let err = build_for("custom", request, None, &Config::default()).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(ref m) if m.contains("provider_endpoint")));
    }

    #[test]
    fn test_operator_api_base_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.providers.insert(
            "moonshot".to_string(),
            ProviderConfig {
                api_base: Some("https://api.moonshot.cn/v1".to_string()),
                ..Default::default()
            },
        );
        let call = build_for("moonshot", sample_request(Capability::Caption, dir.path()), None, &config)
            .unwrap();
        assert_eq!(call.url, "https://api.moonshot.cn/v1/chat/completions");
    }

    // ── Bodies ──

    #[test]
    fn test_electronhub_speech_passes_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Speech, dir.path());
        request.extras = json!({ "emotion_boost": 0.7 }).as_object().unwrap().clone();
        let call = build_for("electronhub", request, None, &Config::default()).unwrap();
        let body = json_body(&call);
        assert_eq!(body["emotion_boost"], 0.7);
        assert_eq!(body["input"], "hello");
        assert_eq!(body["voice"], "alloy");
    }

    #[test]
    fn test_openai_speech_drops_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Speech, dir.path());
        request.extras = json!({ "emotion_boost": 0.7 }).as_object().unwrap().clone();
        let call = build_for("openai", request, None, &Config::default()).unwrap();
        assert!(!json_body(&call).contains_key("emotion_boost"));
    }

    #[test]
    fn test_transcription_is_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "openai",
            sample_request(Capability::Transcription, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        assert!(call.headers.get(CONTENT_TYPE).is_none());
        match &call.body {
            UpstreamBody::Multipart { fields, audio } => {
                assert_eq!(fields["model"], "some-model");
                assert_eq!(fields["language"], "en");
                assert!(audio.path().exists());
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn test_image_generation_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "openai",
            sample_request(Capability::ImageGeneration, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(
            Value::Object(json_body(&call).clone()),
            json!({ "prompt": "a cat", "model": "dall-e-3", "n": 1 })
        );
        assert_eq!(call.url, "https://api.openai.com/v1/images/generations");
    }

    #[test]
    fn test_model_list_has_no_body() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "electronhub",
            sample_request(Capability::ModelList, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        assert!(matches!(call.body, UpstreamBody::Empty));
        assert_eq!(call.url, "https://api.electronhub.ai/v1/models");
    }

    // ── Headers ──

    #[test]
    fn test_bearer_and_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let cred = Credential::Secret("sk-1".to_string());
        let call = build_for(
            "openai",
            sample_request(Capability::Caption, dir.path()),
            Some(&cred),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(call.headers[AUTHORIZATION], "Bearer sk-1");
        assert_eq!(call.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_no_credential_sends_no_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "llamacpp",
            sample_request(Capability::Caption, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        assert!(call.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_attribution_headers() {
        let dir = tempfile::tempdir().unwrap();
        let call = build_for(
            "openrouter",
            sample_request(Capability::Caption, dir.path()),
            None,
            &Config::default(),
        )
        .unwrap();
        assert_eq!(call.headers["x-title"], "Oxigate");
        assert!(call.headers.contains_key("http-referer"));
    }

    #[test]
    fn test_policy_headers_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let policy = ConfigHeaderPolicy::new(vec![HeaderRule {
            url_prefix: "https://openrouter.ai".to_string(),
            headers: HashMap::from([("X-Title".to_string(), "Operator".to_string())]),
        }]);
        let profile = find_by_name("openrouter").unwrap();
        let route = profile.route(Capability::Caption).unwrap();
        let ctx = NormalizeContext {
            config: &config,
            header_policy: &policy,
        };
        let call = build(
            sample_request(Capability::Caption, dir.path()),
            profile,
            route,
            None,
            &ctx,
        )
        .unwrap();
        assert_eq!(call.headers["x-title"], "Operator");
    }

    #[test]
    fn test_custom_include_headers() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = sample_request(Capability::Caption, dir.path());
        request.custom.include_headers = Some("X-Api-Version: '2'".to_string());
        let call = build_for("custom", request, None, &Config::default()).unwrap();
        assert_eq!(call.headers["x-api-version"], "2");
    }
}
