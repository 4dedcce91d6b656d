//! Service wiring.
//!
//! Builds the pipeline collaborators from config, starts the retention
//! sweep for finished tasks, and runs the HTTP server in the foreground.

use crate::analysis::{FirstSpeakerPolicy, RolePolicy};
use crate::api::ApiServer;
use crate::auth::TokenAuthenticator;
use crate::classification;
use crate::config::Config;
use crate::convert::{AudioConverter, FfmpegConverter};
use crate::db::{self, SqliteConversationStore};
use crate::global;
use crate::pipeline::{ConversationPipeline, PipelineSettings, ProgressTracker};
use crate::transcription;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_service() -> Result<()> {
    info!("Starting Callscribe service");

    let config = Config::load()?;

    // Open once up front so migrations run before any request lands.
    db::init_db()?;

    let converter: Arc<dyn AudioConverter> =
        Arc::new(FfmpegConverter::new(global::converted_dir()?)?);
    if !converter.is_available() {
        warn!("ffmpeg not found on PATH; uploads will fail at the conversion stage");
    }

    let transcriber = transcription::from_config(&config.transcription)?;
    info!("Transcription provider: {}", transcriber.name());
    if !transcriber.is_available() {
        warn!(
            "Transcription provider '{}' is not available; check configuration",
            transcriber.name()
        );
    }

    let classifier = classification::from_config(&config.classification)?;
    info!("Classification provider: {}", classifier.name());

    let store = Arc::new(SqliteConversationStore::new());
    let role_policy: Arc<dyn RolePolicy> = Arc::new(FirstSpeakerPolicy);

    let progress = ProgressTracker::default();
    spawn_retention_sweep(progress.clone(), config.pipeline.retention_minutes);

    let settings =
        PipelineSettings::from_config(&config.pipeline, &config.analysis, global::uploads_dir()?);
    let pipeline = Arc::new(ConversationPipeline::new(
        converter,
        transcriber,
        classifier,
        store,
        role_policy,
        progress,
        settings,
    )?);

    let auth = Arc::new(TokenAuthenticator::from_config(&config.auth));
    if config.auth.tokens.is_empty() {
        warn!("No API tokens configured; every authenticated endpoint will answer 401");
    }

    info!("Callscribe is ready!");

    let api_server = ApiServer::new(pipeline, auth, &config);
    api_server.start().await
}

/// Periodically drops finished tasks that have aged past the retention
/// window, so the progress store cannot grow without bound.
fn spawn_retention_sweep(progress: ProgressTracker, retention_minutes: u64) {
    let retention = Duration::from_secs(retention_minutes * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = progress.prune_terminal(retention);
            if removed > 0 {
                info!("Pruned {} finished task(s) from the progress store", removed);
            }
        }
    });
}
