//! Asynchronous conversation-processing pipeline.
//!
//! Admits uploaded recordings, drives each one through conversion,
//! transcription, analysis, and classification, and tracks per-task
//! progress for pollers.

pub mod admission;
pub mod orchestrator;
pub mod progress;
pub mod stage;

pub use admission::{AdmissionError, SubmittedRecording, MAX_BATCH_SIZE, SUPPORTED_MEDIA_TYPES};
pub use orchestrator::{ConversationPipeline, PipelineSettings, SubmitError};
pub use progress::{ProgressError, ProgressTracker, TaskProgress};
pub use stage::{PipelineStage, TaskStatus};
