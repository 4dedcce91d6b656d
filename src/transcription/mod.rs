//! Speech-to-text collaborators and the transcript shapes they produce.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::TranscriptionConfig;

pub mod providers;

pub use providers::{RemoteSttProvider, WhisperCliProvider};

/// One utterance as returned by a speech-to-text engine. The speaker tag is
/// provisional diarization output and may be missing entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub speaker: Option<String>,
    pub text: String,
}

/// Engine output before speaker labeling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTranscript {
    pub text: String,
    pub segments: Vec<RawSegment>,
}

/// A transcript segment with its final speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: Option<f64>,
    pub speaker: String,
    pub text: String,
}

impl TranscriptSegment {
    /// End of the segment for duration math; a missing end contributes
    /// zero duration.
    pub fn effective_end(&self) -> f64 {
        self.end.unwrap_or(self.start)
    }
}

/// The persisted transcript: labeled segments in start order plus the
/// distinct speaker labels in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
    pub speakers: Vec<String>,
}

#[async_trait]
pub trait SpeechToText: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    async fn transcribe(&self, audio_path: &Path) -> Result<RawTranscript>;
}

/// Build the configured speech-to-text engine.
pub fn from_config(config: &TranscriptionConfig) -> Result<Arc<dyn SpeechToText>> {
    let provider_name = config.provider.as_deref().unwrap_or("remote-api");
    with_provider(provider_name, config)
}

pub fn with_provider(
    provider_name: &str,
    config: &TranscriptionConfig,
) -> Result<Arc<dyn SpeechToText>> {
    let language = config.language.clone().unwrap_or_else(|| "en".to_string());

    let provider: Arc<dyn SpeechToText> = match provider_name {
        "remote-api" => Arc::new(RemoteSttProvider::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
            language,
        )?),
        "whisper-cli" => Arc::new(WhisperCliProvider::new(
            config.command_path.clone(),
            config.model_path.clone(),
            language,
        )?),
        _ => bail!(
            "Unknown transcription provider '{}'. Supported providers: remote-api, whisper-cli",
            provider_name
        ),
    };

    info!("Using {} for transcription", provider.name());

    Ok(provider)
}
