//! Dispatcher: performs exactly one upstream HTTP round trip per call.
//!
//! The dispatcher never interprets a response: status, content type and body
//! are handed back raw for the error normalizer and extractor. Temporary
//! audio uploads are released once the round trip ends, on every path.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::GatewayError;
use crate::request::{RawUpstreamResponse, UpstreamBody, UpstreamCall, Verb};
use crate::upload::{AudioUpload, UPLOAD_FILE_NAME, UPLOAD_MIME};

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Sends an upstream call and returns the raw response.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn send(&self, call: UpstreamCall) -> Result<RawUpstreamResponse, GatewayError>;
}

// ─────────────────────────────────────────────
// HttpDispatcher
// ─────────────────────────────────────────────

/// `reqwest`-backed dispatcher with a shared, connection-pooled client.
#[derive(Clone, Debug)]
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Dispatch for HttpDispatcher {
    async fn send(&self, call: UpstreamCall) -> Result<RawUpstreamResponse, GatewayError> {
        let UpstreamCall {
            provider,
            capability,
            verb,
            url,
            headers,
            body,
        } = call;

        debug!(provider, capability = %capability, url = %url, "calling upstream");

        let builder = match verb {
            Verb::Get => self.client.get(&url),
            Verb::Post => self.client.post(&url),
        }
        .headers(headers);

        let result = match body {
            UpstreamBody::Empty => round_trip(builder).await,
            UpstreamBody::Json(map) => round_trip(builder.json(&map)).await,
            UpstreamBody::Multipart { fields, audio } => {
                let result = send_multipart(builder, fields, &audio).await;
                audio.release();
                result
            }
        };

        match &result {
            Ok(raw) if !raw.is_success() => warn!(
                provider,
                status = raw.status,
                body = %String::from_utf8_lossy(&raw.body),
                "upstream request failed"
            ),
            Ok(raw) => debug!(provider, status = raw.status, bytes = raw.body.len(), "upstream responded"),
            Err(e) => error!(provider, error = %e, "upstream request did not complete"),
        }
        result
    }
}

async fn send_multipart(
    builder: reqwest::RequestBuilder,
    fields: serde_json::Map<String, Value>,
    audio: &AudioUpload,
) -> Result<RawUpstreamResponse, GatewayError> {
    debug!(path = %audio.path().display(), "attaching audio upload");
    let bytes = audio.read().await?;
    let file_part = reqwest::multipart::Part::bytes(bytes)
        .file_name(UPLOAD_FILE_NAME)
        .mime_str(UPLOAD_MIME)?;

    let mut form = reqwest::multipart::Form::new().part("file", file_part);
    for (name, value) in fields {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        form = form.text(name, text);
    }
    round_trip(builder.multipart(form)).await
}

/// Send and buffer the response without looking at the status.
async fn round_trip(builder: reqwest::RequestBuilder) -> Result<RawUpstreamResponse, GatewayError> {
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: Bytes = response.bytes().await?;
    Ok(RawUpstreamResponse {
        status,
        content_type,
        body,
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
