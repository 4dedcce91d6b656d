//! Conversation processing orchestrator.
//!
//! Drives each admitted upload through the stage sequence: convert,
//! transcribe, turn-taking analysis, classify, persist. The stage engines
//! are trait objects supplied at construction.

use anyhow::{anyhow, bail, Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::{self, RolePolicy};
use crate::classification::{AnalysisResult, DialogueClassifier};
use crate::config::{AnalysisConfig, PipelineConfig};
use crate::convert::AudioConverter;
use crate::db::{ConversationStore, NewConversation};
use crate::transcription::{SpeechToText, Transcript};

use super::admission::{self, AdmissionError, SubmittedRecording};
use super::progress::ProgressTracker;
use super::stage::{PipelineStage, TaskStatus};

/// Why a submission did not yield a task id.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The caller's fault; nothing was created.
    #[error(transparent)]
    Rejected(#[from] AdmissionError),
    /// Ours; the upload was valid but could not be taken on.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Tunables for the pipeline, shaped from the config file.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub uploads_dir: PathBuf,
    pub max_concurrent_tasks: usize,
    pub silence_threshold: f64,
    pub convert_timeout: Duration,
    pub transcribe_timeout: Duration,
    pub classify_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(
        pipeline: &PipelineConfig,
        analysis: &AnalysisConfig,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            uploads_dir,
            max_concurrent_tasks: pipeline.max_concurrent_tasks.max(1),
            silence_threshold: analysis.silence_threshold_seconds,
            convert_timeout: Duration::from_secs(pipeline.convert_timeout_seconds),
            transcribe_timeout: Duration::from_secs(pipeline.transcribe_timeout_seconds),
            classify_timeout: Duration::from_secs(pipeline.classify_timeout_seconds),
        }
    }
}

/// An upload accepted for processing.
#[derive(Debug, Clone)]
struct AdmittedTask {
    task_id: String,
    user_id: i64,
    file_path: PathBuf,
}

pub struct ConversationPipeline {
    converter: Arc<dyn AudioConverter>,
    transcriber: Arc<dyn SpeechToText>,
    classifier: Arc<dyn DialogueClassifier>,
    store: Arc<dyn ConversationStore>,
    role_policy: Arc<dyn RolePolicy>,
    progress: ProgressTracker,
    limiter: Arc<Semaphore>,
    settings: PipelineSettings,
}

impl ConversationPipeline {
    pub fn new(
        converter: Arc<dyn AudioConverter>,
        transcriber: Arc<dyn SpeechToText>,
        classifier: Arc<dyn DialogueClassifier>,
        store: Arc<dyn ConversationStore>,
        role_policy: Arc<dyn RolePolicy>,
        progress: ProgressTracker,
        settings: PipelineSettings,
    ) -> Result<Self> {
        std::fs::create_dir_all(&settings.uploads_dir)
            .context("Failed to create uploads directory")?;

        Ok(Self {
            converter,
            transcriber,
            classifier,
            store,
            role_policy,
            progress,
            limiter: Arc::new(Semaphore::new(settings.max_concurrent_tasks)),
            settings,
        })
    }

    /// Progress handle shared with pollers.
    pub fn progress(&self) -> ProgressTracker {
        self.progress.clone()
    }

    /// Admit a single upload. Returns the task id as soon as the task is
    /// registered; processing continues in the background.
    pub async fn admit(
        self: &Arc<Self>,
        recording: SubmittedRecording,
        user_id: i64,
    ) -> Result<String, SubmitError> {
        admission::validate_single(&recording)?;
        let task_id = self.register_and_spawn(recording, user_id).await?;
        Ok(task_id)
    }

    /// Admit a batch. Validation is all-or-nothing: if any member fails,
    /// no task ids exist and no bytes were written.
    pub async fn admit_batch(
        self: &Arc<Self>,
        recordings: Vec<SubmittedRecording>,
        user_id: i64,
    ) -> Result<Vec<String>, SubmitError> {
        admission::validate_batch(&recordings)?;

        let mut task_ids = Vec::with_capacity(recordings.len());
        for recording in recordings {
            task_ids.push(self.register_and_spawn(recording, user_id).await?);
        }
        Ok(task_ids)
    }

    async fn register_and_spawn(
        self: &Arc<Self>,
        recording: SubmittedRecording,
        user_id: i64,
    ) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();
        let extension = admission::extension_for(&recording.media_type);
        let file_path = self
            .settings
            .uploads_dir
            .join(format!("{}.{}", task_id, extension));

        tokio::fs::write(&file_path, &recording.bytes)
            .await
            .context("Failed to spool upload to disk")?;

        if let Err(e) = self.progress.create(&task_id) {
            let _ = tokio::fs::remove_file(&file_path).await;
            return Err(anyhow!(e)).context("Failed to register task");
        }

        let task = AdmittedTask {
            task_id: task_id.clone(),
            user_id,
            file_path,
        };
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.process(task).await });

        info!("Task {} admitted for user {}", task_id, user_id);

        Ok(task_id)
    }

    /// Background processing for one task. Runs to a terminal status; a
    /// failure marks this task only and never touches any other entry.
    async fn process(self: Arc<Self>, task: AdmittedTask) {
        // Queue on the worker bound; the task stays pending at stage 0
        // until a permit frees up.
        let permit = match Arc::clone(&self.limiter).acquire_owned().await {
            Ok(permit) => permit,
            // Closed only at shutdown.
            Err(_) => return,
        };

        let task_id = task.task_id.clone();
        match self.run_stages(&task).await {
            Ok(record_id) => {
                info!("Task {} completed as conversation {}", task_id, record_id);
            }
            Err(e) => {
                error!("Task {} failed: {:#}", task_id, e);
                let stage = self
                    .progress
                    .get(&task_id)
                    .map(|p| p.stage)
                    .unwrap_or(PipelineStage::Received);
                let _ = self.progress.update(
                    &task_id,
                    stage,
                    TaskStatus::Error,
                    Some(format!("{:#}", e)),
                );
            }
        }

        drop(permit);
    }

    async fn run_stages(&self, task: &AdmittedTask) -> Result<i64> {
        let task_id = task.task_id.as_str();

        self.set_progress(task_id, PipelineStage::Received, TaskStatus::Running)?;

        let wav_path = self
            .with_deadline(
                self.settings.convert_timeout,
                "Audio conversion",
                self.converter.convert(&task.file_path),
            )
            .await
            .context("Audio conversion failed")?;
        self.set_progress(task_id, PipelineStage::Converted, TaskStatus::Running)?;

        let raw = self
            .with_deadline(
                self.settings.transcribe_timeout,
                "Transcription",
                self.transcriber.transcribe(&wav_path),
            )
            .await
            .context("Transcription failed")?;
        self.set_progress(task_id, PipelineStage::Transcribed, TaskStatus::Running)?;

        let transcript = analysis::label_speakers(raw.segments);
        let turn_taking = analysis::analyze(
            &transcript,
            self.settings.silence_threshold,
            self.role_policy.as_ref(),
        );

        let dialogue = self
            .with_deadline(
                self.settings.classify_timeout,
                "Classification",
                self.classifier.classify(&transcript),
            )
            .await
            .context("Classification failed")?;
        let analysis_result = AnalysisResult::from_parts(dialogue, turn_taking);
        verify_correlation(&transcript, &analysis_result)?;
        self.set_progress(task_id, PipelineStage::Analyzed, TaskStatus::Running)?;

        let record_id = self
            .store
            .insert(NewConversation {
                user_id: task.user_id,
                file_path: task.file_path.to_string_lossy().into_owned(),
                transcript,
                analysis: analysis_result,
            })
            .await
            .context("Failed to persist conversation")?;
        self.set_progress(task_id, PipelineStage::Completed, TaskStatus::Completed)?;

        Ok(record_id)
    }

    fn set_progress(&self, task_id: &str, stage: PipelineStage, status: TaskStatus) -> Result<()> {
        self.progress
            .update(task_id, stage, status, None)
            .map_err(Into::into)
    }

    async fn with_deadline<T>(
        &self,
        deadline: Duration,
        what: &str,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(deadline, operation).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("{} timed out after {}s", what, deadline.as_secs())),
        }
    }
}

/// Every classified segment must point at a transcript segment by exact
/// start timestamp. A mismatch fails the whole task before anything is
/// persisted.
fn verify_correlation(transcript: &Transcript, analysis: &AnalysisResult) -> Result<()> {
    for classified in &analysis.segments {
        if !transcript
            .segments
            .iter()
            .any(|s| s.start == classified.start)
        {
            bail!(
                "Classifier returned a segment at {}s with no matching transcript segment",
                classified.start
            );
        }
    }
    Ok(())
}
