//! Dialogue classification collaborators: per-segment sales phase and
//! sentiment, plus the conversation-level summary.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::analysis::TurnTakingSummary;
use crate::config::ClassificationConfig;
use crate::transcription::Transcript;

pub mod keyword;
pub mod remote_api;

pub use keyword::KeywordClassifier;
pub use remote_api::RemoteClassifier;

/// Phase and sentiment for one utterance. The vocabulary belongs to the
/// classifier; the pipeline stores whatever it returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub phase: String,
    pub sentiment: String,
}

/// Classification correlated back to a transcript segment by its exact
/// start timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSegment {
    pub start: f64,
    pub classification: Classification,
}

/// Conversation-level rollup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub duration: f64,
    pub phase_distribution: BTreeMap<String, f64>,
    pub sentiment_summary: BTreeMap<String, i64>,
}

/// What a classifier returns for one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueAnalysis {
    pub segments: Vec<ClassifiedSegment>,
    pub summary: AnalysisSummary,
}

/// The complete analysis persisted with a conversation: classification
/// plus the turn-taking summary. Assembled once by the pipeline and
/// immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub segments: Vec<ClassifiedSegment>,
    pub summary: AnalysisSummary,
    pub turn_taking: TurnTakingSummary,
}

impl AnalysisResult {
    pub fn from_parts(analysis: DialogueAnalysis, turn_taking: TurnTakingSummary) -> Self {
        Self {
            segments: analysis.segments,
            summary: analysis.summary,
            turn_taking,
        }
    }
}

#[async_trait]
pub trait DialogueClassifier: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    async fn classify(&self, transcript: &Transcript) -> Result<DialogueAnalysis>;
}

/// Build the configured classifier.
pub fn from_config(config: &ClassificationConfig) -> Result<Arc<dyn DialogueClassifier>> {
    let provider_name = config.provider.as_deref().unwrap_or("keyword");
    with_provider(provider_name, config)
}

pub fn with_provider(
    provider_name: &str,
    config: &ClassificationConfig,
) -> Result<Arc<dyn DialogueClassifier>> {
    let provider: Arc<dyn DialogueClassifier> = match provider_name {
        "keyword" => Arc::new(KeywordClassifier::new()),
        "remote-api" => Arc::new(RemoteClassifier::new(
            config.api_endpoint.clone(),
            config.api_key.clone(),
        )?),
        _ => bail!(
            "Unknown classification provider '{}'. Supported providers: keyword, remote-api",
            provider_name
        ),
    };

    info!("Using {} for dialogue classification", provider.name());

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_rejected() {
        let config = ClassificationConfig::default();
        let err = with_provider("tea-leaves", &config).unwrap_err();
        assert!(err.to_string().contains("tea-leaves"));
    }

    #[test]
    fn test_from_config_defaults_to_keyword() {
        let config = ClassificationConfig {
            provider: None,
            ..ClassificationConfig::default()
        };
        let classifier = from_config(&config).unwrap();
        assert_eq!(classifier.name(), "Keyword classifier");
    }

    #[test]
    fn test_analysis_result_assembly() {
        let analysis = DialogueAnalysis {
            segments: vec![ClassifiedSegment {
                start: 0.0,
                classification: Classification {
                    phase: "greeting".to_string(),
                    sentiment: "neutral".to_string(),
                },
            }],
            summary: AnalysisSummary::default(),
        };
        let result = AnalysisResult::from_parts(analysis, TurnTakingSummary::default());

        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.turn_taking.total_turns, 0);
    }
}
