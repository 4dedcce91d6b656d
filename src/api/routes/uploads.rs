//! Upload endpoints.
//!
//! Accepts multipart recordings, admits them into the pipeline, and
//! answers 202 with the task id(s) while processing continues in the
//! background.

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::require_user;
use crate::auth::TokenAuthenticator;
use crate::pipeline::{ConversationPipeline, SubmitError, SubmittedRecording};
use axum::{
    extract::{
        multipart::{Field, Multipart},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct UploadState {
    pub pipeline: Arc<ConversationPipeline>,
    pub auth: Arc<TokenAuthenticator>,
}

/// Creates the upload router.
pub fn router(state: UploadState) -> Router {
    Router::new()
        .route("/upload/single", post(upload_single))
        .route("/upload/batch", post(upload_batch))
        .with_state(state)
}

/// POST /upload/single - Admit one recording (multipart field `file`).
async fn upload_single(
    State(state): State<UploadState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = require_user(&state.auth, &headers)?;

    let mut recording = None;
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("file") {
            recording = Some(read_recording(field).await?);
        }
    }
    let recording =
        recording.ok_or_else(|| ApiError::bad_request("Missing multipart field 'file'"))?;

    info!(
        "Upload received: {} ({} bytes) from user {}",
        recording.file_name,
        recording.bytes.len(),
        user_id
    );

    let task_id = state
        .pipeline
        .admit(recording, user_id)
        .await
        .map_err(submit_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "File uploaded successfully",
            "task_id": task_id,
        })),
    ))
}

/// POST /upload/batch - Admit up to ten recordings (multipart field
/// `files`, repeated). Rejection is all-or-nothing.
async fn upload_batch(
    State(state): State<UploadState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_id = require_user(&state.auth, &headers)?;

    let mut recordings = Vec::new();
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("files") {
            recordings.push(read_recording(field).await?);
        }
    }
    if recordings.is_empty() {
        return Err(ApiError::bad_request("Missing multipart field 'files'"));
    }

    info!(
        "Batch upload received: {} file(s) from user {}",
        recordings.len(),
        user_id
    );

    let task_ids = state
        .pipeline
        .admit_batch(recordings, user_id)
        .await
        .map_err(submit_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Files uploaded successfully",
            "task_ids": task_ids,
        })),
    ))
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, ApiError> {
    multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))
}

async fn read_recording(field: Field<'_>) -> Result<SubmittedRecording, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let media_type = field.content_type().unwrap_or("").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read upload body: {}", e)))?;

    Ok(SubmittedRecording::new(file_name, media_type, bytes.to_vec()))
}

fn submit_error(err: SubmitError) -> ApiError {
    match err {
        SubmitError::Rejected(e) => ApiError::bad_request(e.to_string()),
        SubmitError::Internal(e) => ApiError::from(e),
    }
}
