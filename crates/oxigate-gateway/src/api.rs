//! Caller-facing request shapes and their canonical form.
//!
//! Empty strings are treated as absent everywhere: a form that submits
//! `reverse_proxy: ""` means "no reverse proxy".

use serde::Deserialize;
use serde_json::{Map, Value};

use oxigate_providers::{
    AudioUpload, CanonicalRequest, Capability, CustomDirectives, Payload, Target,
};

/// Speech defaults shared by every speech variant.
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1";
pub const DEFAULT_SPEECH_FORMAT: &str = "mp3";
pub const DEFAULT_SPEED: i64 = 1;
/// Provider used for transcription when the caller doesn't name one.
pub const DEFAULT_TRANSCRIPTION_PROVIDER: &str = "openai";

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ─────────────────────────────────────────────
// Captioning
// ─────────────────────────────────────────────

/// Body of `POST /caption-image`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaptionRequest {
    /// Provider id.
    pub api: String,
    pub model: Option<String>,
    pub prompt: Option<String>,
    /// Image URL or data URI.
    pub image: Option<String>,
    pub reverse_proxy: Option<String>,
    pub proxy_password: Option<String>,
    pub custom_include_body: Option<String>,
    pub custom_include_headers: Option<String>,
    pub custom_exclude_body: Option<String>,
    pub server_url: Option<String>,
}

impl CaptionRequest {
    pub fn into_canonical(self) -> (String, CanonicalRequest) {
        let mut request = CanonicalRequest::new(Capability::Caption);
        request.model = present(self.model);
        request.prompt = self.prompt;
        if let Some(image) = present(self.image) {
            request.payload = Payload::Image(image);
        }
        request.target = Target {
            reverse_proxy: present(self.reverse_proxy),
            proxy_password: present(self.proxy_password),
            server_url: present(self.server_url),
            provider_endpoint: None,
        };
        request.custom = CustomDirectives {
            include_body: present(self.custom_include_body),
            include_headers: present(self.custom_include_headers),
            exclude_body: present(self.custom_exclude_body),
        };
        (self.api, request)
    }
}

// ─────────────────────────────────────────────
// Transcription
// ─────────────────────────────────────────────

/// Fields of the `POST /transcribe-audio` multipart form.
#[derive(Debug, Default)]
pub struct TranscriptionRequest {
    /// Provider id; `openai` when absent.
    pub api: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub audio: Option<AudioUpload>,
}

impl TranscriptionRequest {
    pub fn into_canonical(self) -> (String, CanonicalRequest) {
        let provider =
            present(self.api).unwrap_or_else(|| DEFAULT_TRANSCRIPTION_PROVIDER.to_string());
        let mut request = CanonicalRequest::new(Capability::Transcription);
        request.model = self.model;
        if let Some(language) = present(self.language) {
            request.params.insert("language".to_string(), Value::from(language));
        }
        if let Some(audio) = self.audio {
            request.payload = Payload::Audio(audio);
        }
        (provider, request)
    }
}

// ─────────────────────────────────────────────
// Speech
// ─────────────────────────────────────────────

/// The three speech endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechVariant {
    /// `POST /generate-voice`
    OpenAi,
    /// `POST /electronhub/generate-voice` (extra-field passthrough)
    ElectronHub,
    /// `POST /custom/generate-voice` (caller `provider_endpoint`)
    Custom,
}

impl SpeechVariant {
    pub fn provider(&self) -> &'static str {
        match self {
            SpeechVariant::OpenAi => "openai",
            SpeechVariant::ElectronHub => "electronhub",
            SpeechVariant::Custom => "custom",
        }
    }
}

/// Fields the ElectronHub variant always claims, whether or not it sends them.
///
/// Optional fields join the known set only when they were accepted into the
/// upstream body; a rejected value (empty string, non-number) passes through
/// verbatim like any other unknown field.
pub const ELECTRONHUB_BASE_FIELDS: &[&str] = &[
    "input",
    "voice",
    "speed",
    "temperature",
    "model",
    "response_format",
];

const ELECTRONHUB_NUMERIC: &[&str] = &["cfg_scale", "cfg_filter_top_k", "speech_rate", "pitch_adjustment"];
const ELECTRONHUB_OPTIONAL: &[&str] = &["instructions", "speaker_transcript", "emotional_style"];

/// Turn a speech request body into its canonical form.
pub fn speech_request(variant: SpeechVariant, body: Map<String, Value>) -> CanonicalRequest {
    let mut request = CanonicalRequest::new(Capability::Speech);
    let params = &mut request.params;

    match variant {
        SpeechVariant::OpenAi => {
            request.prompt = text_field(&body, "text").or_else(|| text_field(&body, "input"));
            request.model = Some(
                text_field(&body, "model").unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            );
            params.insert("response_format".into(), Value::from(DEFAULT_SPEECH_FORMAT));
            params.insert("voice".into(), or_default(&body, "voice", Value::from(DEFAULT_VOICE)));
            params.insert("speed".into(), or_default(&body, "speed", Value::from(DEFAULT_SPEED)));
            copy_if_truthy(&body, params, "instructions");
        }
        SpeechVariant::ElectronHub => {
            request.prompt = text_field(&body, "input").or_else(|| text_field(&body, "text"));
            request.model = Some(
                present(text_field(&body, "model"))
                    .unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            );
            if let Some(voice) = body.get("voice").filter(|v| !v.is_null()) {
                params.insert("voice".into(), voice.clone());
            }
            params.insert("speed".into(), or_default(&body, "speed", Value::from(DEFAULT_SPEED)));
            if let Some(temperature) = body.get("temperature").filter(|v| !v.is_null()) {
                params.insert("temperature".into(), temperature.clone());
            }
            params.insert("response_format".into(), Value::from(DEFAULT_SPEECH_FORMAT));
            for field in ELECTRONHUB_OPTIONAL {
                copy_if_truthy(&body, params, field);
            }
            for field in ELECTRONHUB_NUMERIC {
                if let Some(n) = body.get(*field).and_then(Value::as_f64).filter(|n| n.is_finite()) {
                    params.insert((*field).to_string(), Value::from(n));
                }
            }
            request.extras = body
                .iter()
                .filter(|(k, _)| {
                    !ELECTRONHUB_BASE_FIELDS.contains(&k.as_str()) && !params.contains_key(*k)
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        SpeechVariant::Custom => {
            request.prompt = Some(text_field(&body, "input").unwrap_or_default());
            request.model = Some(
                text_field(&body, "model").unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            );
            params.insert(
                "response_format".into(),
                or_default(&body, "response_format", Value::from(DEFAULT_SPEECH_FORMAT)),
            );
            params.insert("voice".into(), or_default(&body, "voice", Value::from(DEFAULT_VOICE)));
            params.insert("speed".into(), or_default(&body, "speed", Value::from(DEFAULT_SPEED)));
            request.target.provider_endpoint = present(text_field(&body, "provider_endpoint"));
        }
    }

    request
}

fn text_field(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_string)
}

/// The caller's value unless it is absent or null.
fn or_default(body: &Map<String, Value>, field: &str, default: Value) -> Value {
    body.get(field).filter(|v| !v.is_null()).cloned().unwrap_or(default)
}

fn copy_if_truthy(body: &Map<String, Value>, params: &mut Map<String, Value>, field: &str) {
    if let Some(value) = body.get(field).filter(|v| truthy(v)) {
        params.insert(field.to_string(), value.clone());
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ─────────────────────────────────────────────
// Image generation / model listing
// ─────────────────────────────────────────────

/// `POST /generate-image`: the caller's object goes upstream verbatim.
pub fn image_request(body: Map<String, Value>) -> CanonicalRequest {
    let mut request = CanonicalRequest::new(Capability::ImageGeneration);
    request.payload = Payload::Verbatim(body);
    request
}

pub fn model_list_request() -> CanonicalRequest {
    CanonicalRequest::new(Capability::ModelList)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_caption_blank_fields_are_absent() {
        let req: CaptionRequest = serde_json::from_value(json!({
            "api": "openai",
            "model": "gpt-4o",
            "prompt": "What is it?",
            "image": "data:image/png;base64,AA",
            "reverse_proxy": "",
            "proxy_password": "",
            "custom_exclude_body": ""
        }))
        .unwrap();
        let (provider, canonical) = req.into_canonical();
        assert_eq!(provider, "openai");
        assert!(canonical.target.reverse_proxy.is_none());
        assert!(canonical.target.proxy_password.is_none());
        assert!(canonical.custom.exclude_body.is_none());
        assert!(matches!(canonical.payload, Payload::Image(_)));
    }

    #[test]
    fn test_caption_missing_api_is_empty() {
        let req: CaptionRequest = serde_json::from_value(json!({ "prompt": "x" })).unwrap();
        assert_eq!(req.into_canonical().0, "");
    }

    #[test]
    fn test_transcription_defaults_to_openai() {
        let (provider, canonical) = TranscriptionRequest {
            model: Some("whisper-1".to_string()),
            language: Some(String::new()),
            ..Default::default()
        }
        .into_canonical();
        assert_eq!(provider, "openai");
        assert!(canonical.params.is_empty());
        assert!(matches!(canonical.payload, Payload::None));
    }

    #[test]
    fn test_openai_speech_defaults() {
        let req = speech_request(SpeechVariant::OpenAi, object(json!({ "text": "Hello" })));
        assert_eq!(req.prompt.as_deref(), Some("Hello"));
        assert_eq!(req.model.as_deref(), Some("tts-1"));
        assert_eq!(Value::Object(req.params), json!({
            "response_format": "mp3",
            "voice": "alloy",
            "speed": 1
        }));
        assert!(req.extras.is_empty());
    }

    #[test]
    fn test_openai_speech_caller_values() {
        let req = speech_request(
            SpeechVariant::OpenAi,
            object(json!({
                "text": "Hi",
                "voice": "nova",
                "speed": 1.5,
                "model": "gpt-4o-mini-tts",
                "instructions": "whisper",
                "response_format": "wav"
            })),
        );
        assert_eq!(req.model.as_deref(), Some("gpt-4o-mini-tts"));
        assert_eq!(req.params["voice"], "nova");
        assert_eq!(req.params["speed"], 1.5);
        assert_eq!(req.params["instructions"], "whisper");
        assert_eq!(req.params["response_format"], "mp3");
    }

    #[test]
    fn test_electronhub_known_and_extra_fields() {
        let req = speech_request(
            SpeechVariant::ElectronHub,
            object(json!({
                "input": "Hello",
                "voice": "aria",
                "model": "",
                "cfg_scale": 1.2,
                "speech_rate": "fast",
                "instructions": "",
                "emotional_style": "calm",
                "emotion_boost": 0.7,
                "seed": null
            })),
        );
        assert_eq!(req.prompt.as_deref(), Some("Hello"));
        assert_eq!(req.model.as_deref(), Some("tts-1"));
        assert_eq!(req.params["voice"], "aria");
        assert_eq!(req.params["speed"], 1);
        assert_eq!(req.params["cfg_scale"], 1.2);
        assert_eq!(req.params["emotional_style"], "calm");
        assert!(!req.params.contains_key("speech_rate"));
        assert!(!req.params.contains_key("instructions"));
        assert!(!req.params.contains_key("temperature"));
        // Values the variant didn't accept travel upstream untouched.
        assert_eq!(
            Value::Object(req.extras),
            json!({
                "speech_rate": "fast",
                "instructions": "",
                "emotion_boost": 0.7,
                "seed": null
            })
        );
    }

    #[test]
    fn test_electronhub_rejected_optionals_pass_through() {
        let req = speech_request(
            SpeechVariant::ElectronHub,
            object(json!({
                "input": "Hello",
                "text": "ignored",
                "cfg_scale": "1.2",
                "cfg_filter_top_k": 40,
                "speaker_transcript": ""
            })),
        );
        assert_eq!(req.params["cfg_filter_top_k"], 40.0);
        assert_eq!(
            Value::Object(req.extras),
            json!({ "text": "ignored", "cfg_scale": "1.2", "speaker_transcript": "" })
        );
    }

    #[test]
    fn test_electronhub_without_voice() {
        let req = speech_request(SpeechVariant::ElectronHub, object(json!({ "input": "x" })));
        assert!(!req.params.contains_key("voice"));
    }

    #[test]
    fn test_custom_speech_defaults() {
        let req = speech_request(
            SpeechVariant::Custom,
            object(json!({ "provider_endpoint": "http://tts.local/v1/audio/speech" })),
        );
        assert_eq!(req.prompt.as_deref(), Some(""));
        assert_eq!(
            req.target.provider_endpoint.as_deref(),
            Some("http://tts.local/v1/audio/speech")
        );
        assert_eq!(req.params["response_format"], "mp3");
        assert_eq!(req.params["voice"], "alloy");
    }

    #[test]
    fn test_custom_speech_keeps_caller_format() {
        let req = speech_request(
            SpeechVariant::Custom,
            object(json!({ "input": "x", "response_format": "wav", "provider_endpoint": "" })),
        );
        assert_eq!(req.params["response_format"], "wav");
        assert!(req.target.provider_endpoint.is_none());
    }

    #[test]
    fn test_image_request_is_verbatim() {
        let body = object(json!({ "prompt": "a cat", "size": "1024x1024" }));
        let req = image_request(body.clone());
        assert!(matches!(req.payload, Payload::Verbatim(ref b) if *b == body));
    }
}
