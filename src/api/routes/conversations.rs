//! Conversation search, stats, and export endpoints.

use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::require_user;
use crate::auth::{TokenAuthenticator, UserId};
use crate::db::{self, ConversationRecord, ConversationRepository};
use crate::export::{self, ExportFormat};
use crate::search::{self, ConversationFilters, ConversationStats, ConversationSummary};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConversationsState {
    pub auth: Arc<TokenAuthenticator>,
}

/// Query parameters for conversation search.
#[derive(Debug, Deserialize, Default)]
pub struct SearchQueryParams {
    /// Text query matched against the transcript
    pub query: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD)
    pub end_date: Option<String>,
    /// Keep only conversations containing this phase
    pub phase: Option<String>,
    /// Keep only conversations containing this sentiment
    pub sentiment: Option<String>,
    /// Maximum results (default 20)
    pub limit: Option<usize>,
}

/// Query parameters for conversation export.
#[derive(Debug, Deserialize, Default)]
pub struct ExportQueryParams {
    /// Output format: json, csv, or txt (default json)
    pub format: Option<String>,
}

/// Creates the conversations router.
pub fn router(state: ConversationsState) -> Router {
    Router::new()
        .route("/conversations/search", get(search_conversations))
        .route("/conversations/stats", get(conversation_stats))
        .route("/conversations/:id/export", get(export_conversation))
        .with_state(state)
}

/// GET /conversations/search - List the caller's conversations.
async fn search_conversations(
    State(state): State<ConversationsState>,
    headers: HeaderMap,
    Query(params): Query<SearchQueryParams>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let user_id = require_user(&state.auth, &headers)?;

    let filters = ConversationFilters {
        query: params.query,
        start_date: params.start_date,
        end_date: params.end_date,
        phase: params.phase,
        sentiment: params.sentiment,
        limit: params.limit.unwrap_or(20),
    };

    let summaries = with_connection(move |conn| search::search(conn, user_id, &filters)).await?;
    Ok(Json(summaries))
}

/// GET /conversations/stats - Aggregate stats for the caller.
async fn conversation_stats(
    State(state): State<ConversationsState>,
    headers: HeaderMap,
) -> ApiResult<Json<ConversationStats>> {
    let user_id = require_user(&state.auth, &headers)?;

    let stats = with_connection(move |conn| search::stats(conn, user_id)).await?;
    Ok(Json(stats))
}

/// GET /conversations/:id/export - Render one conversation as
/// json, csv, or txt.
async fn export_conversation(
    State(state): State<ConversationsState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<ExportQueryParams>,
) -> ApiResult<Response> {
    let user_id = require_user(&state.auth, &headers)?;

    let format = ExportFormat::from_flag(params.format.as_deref().unwrap_or("json"))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let record = fetch_record(id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Conversation {} not found", id)))?;

    let body = export::render(&record, format).map_err(|e| ApiError::internal(e.to_string()))?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type());
    if !matches!(format, ExportFormat::Structured) {
        response = response.header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"conversation_{}.{}\"",
                id,
                format.file_extension()
            ),
        );
    }

    response
        .body(Body::from(body))
        .map_err(|e| ApiError::internal(e.to_string()))
}

async fn fetch_record(id: i64, user_id: UserId) -> ApiResult<Option<ConversationRecord>> {
    with_connection(move |conn| ConversationRepository::get_for_user(conn, id, user_id)).await
}

/// Runs a blocking database closure off the async runtime.
async fn with_connection<T, F>(operation: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> anyhow::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        operation(&conn)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Database task panicked: {}", e)))?;

    result.map_err(ApiError::from)
}
