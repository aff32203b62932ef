//! HTTP surface: axum routes under `/api/openai`.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, FromRequest, Multipart, Request, State,
    },
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use oxigate_core::secrets::UserScope;
use oxigate_providers::{AudioUpload, GatewayError};

use crate::api::{CaptionRequest, SpeechVariant, TranscriptionRequest};
use crate::gateway::Gateway;

/// Header naming the user whose secrets a request uses.
pub const USER_HEADER: &str = "x-oxigate-user";
/// Largest accepted request body (audio uploads, data-URI images).
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the axum router with every capability endpoint.
pub fn router(state: Gateway) -> Router {
    let api = Router::new()
        .route("/caption-image", post(caption_image))
        .route("/transcribe-audio", post(transcribe_audio))
        .route("/generate-voice", post(generate_voice))
        .route("/electronhub/generate-voice", post(electronhub_generate_voice))
        .route("/electronhub/models", post(electronhub_models))
        .route("/custom/generate-voice", post(custom_generate_voice))
        .route("/generate-image", post(generate_image));

    Router::new()
        .nest("/api/openai", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ─────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────

/// A [`GatewayError`] rendered as one status and a plain-text body.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.caller_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.is_client_error() {
            warn!(status = %status, error = %self.0, "request rejected");
        } else {
            warn!(status = %status, error = %self.0, "request failed");
        }
        (status, self.0.caller_body()).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ─────────────────────────────────────────────
// Extractors
// ─────────────────────────────────────────────

/// JSON body whose rejections surface as `InvalidRequest`.
///
/// Parser and deserializer details go to the log, not to the caller.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(invalid_json(rejection))),
        }
    }
}

fn invalid_json(rejection: JsonRejection) -> GatewayError {
    debug!(status = %rejection.status(), reason = %rejection.body_text(), "json body rejected");
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected an application/json body",
        JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON",
        JsonRejection::JsonDataError(_) => "request body has the wrong shape",
        _ => "request body could not be read",
    };
    GatewayError::InvalidRequest(message.to_string())
}

/// Multipart form whose rejections surface as `InvalidRequest`.
pub struct ApiMultipart(pub Multipart);

impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(Self)
            .map_err(|rejection: MultipartRejection| {
                debug!(reason = %rejection.body_text(), "multipart body rejected");
                ApiError(GatewayError::InvalidRequest(
                    "expected a multipart/form-data body".to_string(),
                ))
            })
    }
}

fn user_of(state: &Gateway, headers: &HeaderMap) -> UserScope {
    state.user_scope(headers.get(USER_HEADER).and_then(|v| v.to_str().ok()))
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

async fn caption_image(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<CaptionRequest>,
) -> ApiResult<Json<Value>> {
    let user = user_of(&state, &headers);
    let caption = state.caption_image(&user, request).await?;
    Ok(Json(json!({ "caption": caption })))
}

async fn transcribe_audio(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<Json<Value>> {
    let user = user_of(&state, &headers);
    let request = read_transcription_form(&state, multipart).await?;
    Ok(Json(state.transcribe_audio(&user, request).await?))
}

/// Collect the transcription form, spooling the audio file to disk.
async fn read_transcription_form(
    state: &Gateway,
    mut multipart: Multipart,
) -> Result<TranscriptionRequest, GatewayError> {
    let mut request = TranscriptionRequest::default();
    let upload_dir = state.upload_dir();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(invalid_form)?;
                debug!(bytes = bytes.len(), "audio upload received");
                request.audio = Some(AudioUpload::persist(upload_dir.as_deref(), &bytes)?);
            }
            "model" => request.model = Some(field.text().await.map_err(invalid_form)?),
            "language" => request.language = Some(field.text().await.map_err(invalid_form)?),
            "api" => request.api = Some(field.text().await.map_err(invalid_form)?),
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(request)
}

fn invalid_form(e: MultipartError) -> GatewayError {
    debug!(reason = %e.body_text(), "multipart field rejected");
    GatewayError::InvalidRequest("malformed multipart form".to_string())
}

async fn generate_voice(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Response> {
    speech(state, headers, SpeechVariant::OpenAi, body).await
}

async fn electronhub_generate_voice(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Response> {
    speech(state, headers, SpeechVariant::ElectronHub, body).await
}

async fn custom_generate_voice(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Response> {
    speech(state, headers, SpeechVariant::Custom, body).await
}

async fn speech(
    state: Gateway,
    headers: HeaderMap,
    variant: SpeechVariant,
    body: Map<String, Value>,
) -> ApiResult<Response> {
    let user = user_of(&state, &headers);
    let audio = state.synthesize_speech(&user, variant, body).await?;
    Ok(([(CONTENT_TYPE, audio.content_type)], audio.bytes).into_response())
}

async fn generate_image(
    State(state): State<Gateway>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let user = user_of(&state, &headers);
    Ok(Json(state.generate_image(&user, body).await?))
}

async fn electronhub_models(
    State(state): State<Gateway>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user = user_of(&state, &headers);
    Ok(Json(state.list_models(&user).await?))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
