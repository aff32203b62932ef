//! Response extractors: pull the capability result out of a provider envelope.

use serde_json::Value;
use tracing::{debug, warn};

use oxigate_core::types::{ChatCompletionResponse, CohereChatResponse};

use crate::error::{check_status, GatewayError, NOT_JSON, NO_CAPTION};
use crate::registry::Extractor;
use crate::request::{CapabilityOutput, RawUpstreamResponse};

/// Content type assumed for audio when upstream doesn't send one.
pub const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

/// Classify `raw` and, on success, apply `extractor` to it.
pub fn extract(
    extractor: Extractor,
    raw: RawUpstreamResponse,
) -> Result<CapabilityOutput, GatewayError> {
    let raw = check_status(raw)?;

    match extractor {
        Extractor::ChatCaption => {
            let caption = serde_json::from_value::<ChatCompletionResponse>(parse_json(&raw)?)
                .ok()
                .and_then(ChatCompletionResponse::first_text);
            caption_or_fail(caption)
        }
        Extractor::CohereCaption => {
            let caption = serde_json::from_value::<CohereChatResponse>(parse_json(&raw)?)
                .ok()
                .and_then(CohereChatResponse::first_text);
            caption_or_fail(caption)
        }
        Extractor::Audio => {
            let content_type = raw
                .content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUDIO_TYPE.to_string());
            debug!(content_type = %content_type, bytes = raw.body.len(), "audio received");
            Ok(CapabilityOutput::Audio {
                content_type,
                bytes: raw.body,
            })
        }
        Extractor::Json => parse_json(&raw).map(CapabilityOutput::Json),
        Extractor::ModelList => {
            let models = match parse_json(&raw)? {
                Value::Object(mut map) => match map.remove("data") {
                    Some(Value::Array(models)) => models,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            debug!(count = models.len(), "model list received");
            Ok(CapabilityOutput::Json(Value::Array(models)))
        }
    }
}

fn parse_json(raw: &RawUpstreamResponse) -> Result<Value, GatewayError> {
    serde_json::from_slice(&raw.body).map_err(|e| {
        warn!(error = %e, "upstream success response is not JSON");
        GatewayError::UpstreamMalformed(NOT_JSON)
    })
}

fn caption_or_fail(caption: Option<String>) -> Result<CapabilityOutput, GatewayError> {
    match caption {
        Some(text) => Ok(CapabilityOutput::Caption(text)),
        None => {
            warn!("upstream response carried no caption");
            Err(GatewayError::UpstreamMalformed(NO_CAPTION))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
