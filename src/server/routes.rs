use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::error::ApiError;
use super::state::AppState;
use crate::dispatch::AggregatedResponse;
use crate::error::{RelayError, Result};
use crate::media::TempUpload;

const PROMPT_FIELD: &str = "prompt";
const MEDIA_FIELD: &str = "mediaFile";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// `GET /health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/chat` with a multipart form of `prompt` and/or `mediaFile`.
pub async fn chat_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<AggregatedResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        RelayError::InvalidRequest(format!("Expected a multipart form body: {e}"))
    })?;

    let mut prompt: Option<String> = None;
    // Dropping the guard deletes the file, on every return path below.
    let mut upload: Option<TempUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed_body)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PROMPT_FIELD) => {
                prompt = Some(field.text().await.map_err(malformed_body)?);
            }
            Some(MEDIA_FIELD) if upload.is_none() => {
                upload = receive_upload(&state, field).await?;
            }
            other => {
                debug!(field = ?other, "Ignoring form field");
            }
        }
    }

    info!(
        has_prompt = prompt.is_some(),
        has_media = upload.is_some(),
        "Received /api/chat request"
    );

    let media = match upload {
        Some(upload) => Some(upload.into_media().await?),
        None => None,
    };

    let response = state.dispatcher().dispatch(prompt, media).await?;
    Ok(Json(response))
}

/// Stream a file field to disk. An empty file part counts as no file.
async fn receive_upload(state: &AppState, mut field: Field<'_>) -> Result<Option<TempUpload>> {
    let mime_type = field
        .content_type()
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string();
    let upload = TempUpload::create(state.upload_dir(), mime_type)?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(upload.path())
        .await?;

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(malformed_body)? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    if written == 0 {
        debug!("Ignoring empty media upload");
        return Ok(None);
    }

    debug!(
        bytes = written,
        mime_type = upload.mime_type(),
        "Stored media upload"
    );
    Ok(Some(upload))
}

/// Classify a multipart failure by the status axum assigns it.
fn malformed_body(err: MultipartError) -> RelayError {
    let status = err.status();
    let reason = err.body_text();

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge(reason)
    } else if status.is_client_error() {
        RelayError::InvalidRequest(format!("Malformed multipart body: {reason}"))
    } else {
        RelayError::Internal(format!("Failed to read multipart body: {reason}"))
    }
}
