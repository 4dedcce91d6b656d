//! REST API server for Callscribe.
//!
//! Provides HTTP endpoints for:
//! - Recording uploads (single and batch)
//! - Task progress polling
//! - Conversation search and stats
//! - Conversation export (json, csv, txt)

pub mod error;
pub mod routes;

use crate::auth::TokenAuthenticator;
use crate::config::Config;
use crate::pipeline::ConversationPipeline;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::conversations::ConversationsState;
pub use routes::progress::ProgressState;
pub use routes::uploads::UploadState;

pub struct ApiServer {
    port: u16,
    max_upload_bytes: usize,
    uploads: UploadState,
    progress: ProgressState,
    conversations: ConversationsState,
}

impl ApiServer {
    pub fn new(
        pipeline: Arc<ConversationPipeline>,
        auth: Arc<TokenAuthenticator>,
        config: &Config,
    ) -> Self {
        Self {
            port: config.server.port,
            max_upload_bytes: config.server.max_upload_bytes,
            uploads: UploadState {
                pipeline: Arc::clone(&pipeline),
                auth: Arc::clone(&auth),
            },
            progress: ProgressState {
                progress: pipeline.progress(),
                auth: Arc::clone(&auth),
            },
            conversations: ConversationsState { auth },
        }
    }

    /// Assembles the full router. Split out from `start` so tests can
    /// drive the routes without binding a socket.
    pub fn router(&self) -> Router {
        Router::new()
            // Root and version endpoints
            .route("/", get(service_info))
            .route("/version", get(version))
            // Pipeline endpoints
            .merge(routes::uploads::router(self.uploads.clone()))
            .merge(routes::progress::router(self.progress.clone()))
            // Stored conversation endpoints
            .merge(routes::conversations::router(self.conversations.clone()))
            .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(self.max_upload_bytes)))
    }

    pub async fn start(self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", self.port)).await?;

        info!("API server listening on http://0.0.0.0:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                         - Service info");
        info!("  GET  /version                  - Get version info");
        info!("  POST /upload/single            - Upload one recording");
        info!("  POST /upload/batch             - Upload up to 10 recordings");
        info!("  GET  /progress/:task_id        - Poll task progress");
        info!("  GET  /conversations/search     - Search conversations");
        info!("  GET  /conversations/stats      - Aggregate conversation stats");
        info!("  GET  /conversations/:id/export - Export a conversation");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "callscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "callscribe"
    }))
}
