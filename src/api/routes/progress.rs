//! Task progress endpoint.

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::require_user;
use crate::auth::TokenAuthenticator;
use crate::pipeline::ProgressTracker;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressState {
    pub progress: ProgressTracker,
    pub auth: Arc<TokenAuthenticator>,
}

/// Response body for a progress poll.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub task_id: String,
    pub stage: u8,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Creates the progress router.
pub fn router(state: ProgressState) -> Router {
    Router::new()
        .route("/progress/:task_id", get(get_progress))
        .with_state(state)
}

/// GET /progress/:task_id - Current stage and status for one task.
async fn get_progress(
    State(state): State<ProgressState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    require_user(&state.auth, &headers)?;

    let progress = state
        .progress
        .get(&task_id)
        .map_err(|_| ApiError::not_found(format!("Task {} not found", task_id)))?;

    Ok(Json(ProgressResponse {
        task_id,
        stage: progress.stage.ordinal(),
        status: progress.status.as_str().to_string(),
        error_detail: progress.error_detail,
    }))
}
