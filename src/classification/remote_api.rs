use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use super::{DialogueAnalysis, DialogueClassifier};
use crate::transcription::{Transcript, TranscriptSegment};

#[derive(Debug, Serialize)]
struct ClassificationPayload<'a> {
    segments: &'a [TranscriptSegment],
    speakers: &'a [String],
}

#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorDetail {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

#[derive(Debug)]
pub struct RemoteClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteClassifier {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::new();
        let endpoint =
            endpoint.context("api_endpoint is required for the remote-api classifier")?;

        info!("Initialized remote classifier with endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl DialogueClassifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "Remote classification API"
    }

    async fn classify(&self, transcript: &Transcript) -> Result<DialogueAnalysis> {
        debug!(
            "Sending {} segments to classification API",
            transcript.segments.len()
        );

        let body = ClassificationPayload {
            segments: &transcript.segments,
            speakers: &transcript.speakers,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to classification API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            error!(
                "Classification API request failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "Classification API error: {} (type: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.r#type,
                    error_response.error.code
                ));
            }

            return Err(anyhow::anyhow!(
                "Classification API request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let analysis: DialogueAnalysis = serde_json::from_str(&response_text)
            .context("Failed to parse classification response")?;

        info!(
            "Classification complete: {} segments classified",
            analysis.segments.len()
        );

        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_required() {
        let err = RemoteClassifier::new(None, None).unwrap_err();
        assert!(err.to_string().contains("api_endpoint"));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "segments": [
                {"start": 0.0, "classification": {"phase": "greeting", "sentiment": "neutral"}}
            ],
            "summary": {
                "duration": 12.5,
                "phase_distribution": {"greeting": 12.5},
                "sentiment_summary": {"neutral": 1}
            }
        }"#;

        let analysis: DialogueAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(analysis.segments.len(), 1);
        assert_eq!(analysis.segments[0].classification.phase, "greeting");
        assert_eq!(analysis.summary.duration, 12.5);
    }
}
