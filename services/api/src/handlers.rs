//! Axum Handlers
//!
//! The chat endpoint runs one voice turn. A completed turn answers with JSON;
//! any pipeline failure answers with the fallback audio and `X-Error: true`,
//! always with a success status so voice clients have something to play.

use axum::{
    Json,
    body::Bytes,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
    },
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use anyhow::Context;
use std::sync::Arc;
use tracing::error;
use voxrelay_core::SessionId;

use crate::{
    models::{ChatResponse, ChatUpload, ErrorResponse},
    state::AppState,
};

/// Multipart part carrying the recorded utterance.
pub const AUDIO_FIELD: &str = "audio_file";

/// Response header flagging degraded mode.
pub static ERROR_HEADER: HeaderName = HeaderName::from_static("x-error");

pub enum ApiError {
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Run one conversational turn from an uploaded recording.
#[utoipa::path(
    post,
    path = "/agent/chat/{session_id}",
    request_body(content = ChatUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Turn completed. On any pipeline failure the body is instead the fallback MPEG audio and the `X-Error: true` header is set.", body = ChatResponse),
        (status = 400, description = "Missing or unreadable audio upload", body = ErrorResponse),
        (status = 500, description = "Fallback audio is unavailable on the server", body = ErrorResponse)
    ),
    params(
        ("session_id" = String, Path, description = "The unique ID for the chat session.")
    )
)]
pub async fn agent_chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let session_id = SessionId::try_from(session_id).map_err(ApiError::BadRequest)?;
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?;
    let audio = read_audio_field(&mut multipart).await?;

    match state.orchestrator.run_turn(&session_id, audio).await {
        Ok(result) => Ok(Json(ChatResponse::from(result)).into_response()),
        // The orchestrator has already logged the failing stage and cause.
        Err(_) => fallback_response(&state.config.fallback_audio_path).await,
    }
}

/// Returns the bytes of the `audio_file` part, skipping any other parts.
async fn read_audio_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
    {
        if field.name() == Some(AUDIO_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read {}: {}", AUDIO_FIELD, e)));
        }
    }
    Err(ApiError::BadRequest(format!(
        "{} part is required",
        AUDIO_FIELD
    )))
}

/// The uniform degraded-mode reply.
async fn fallback_response(path: &std::path::Path) -> Result<Response, ApiError> {
    let audio = tokio::fs::read(path)
        .await
        .with_context(|| format!("Fallback audio file is missing at {}", path.display()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (ERROR_HEADER.clone(), HeaderValue::from_static("true")),
        ],
        audio,
    )
        .into_response())
}
