use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, info};

use super::super::{RawSegment, RawTranscript, SpeechToText};

async fn encode_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).await?;
    Ok(BASE64.encode(&bytes))
}

#[derive(Debug, Serialize)]
struct TranscriptionPayload {
    content: String, // base64 audio
    language: String,
    timestamps: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    result: TranscriptionResult,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResult {
    text: String,
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    r#type: Option<String>,
    code: Option<String>,
}

#[derive(Debug)]
pub struct RemoteSttProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    language: String,
}

impl RemoteSttProvider {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        language: String,
    ) -> Result<Self> {
        let client = reqwest::Client::new();
        let endpoint = endpoint
            .unwrap_or_else(|| "https://audio.callscribe.link/api/v1/transcriptions".to_string());

        info!("Initialized remote transcription provider with endpoint: {}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key,
            language,
        })
    }
}

#[async_trait]
impl SpeechToText for RemoteSttProvider {
    fn name(&self) -> &'static str {
        "Remote transcription API"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<RawTranscript> {
        info!("Transcribing audio file via remote API: {:?}", audio_path);

        let content = encode_file(audio_path).await?;

        let body = TranscriptionPayload {
            content,
            language: self.language.clone(),
            timestamps: true,
        };

        debug!("Sending request to transcription API");

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to transcription API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            error!(
                "Transcription API request failed with status {}: {}",
                status, response_text
            );

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(anyhow::anyhow!(
                    "Transcription API error: {} (type: {:?}, code: {:?})",
                    error_response.error.message,
                    error_response.error.r#type,
                    error_response.error.code
                ));
            }

            return Err(anyhow::anyhow!(
                "Transcription API request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let transcription: TranscriptionResponse = serde_json::from_str(&response_text)
            .context("Failed to parse transcription response")?;

        let text = transcription.result.text.trim().to_string();
        let mut segments = transcription.result.segments;

        // Engines without timestamp support return plain text only; treat
        // it as one untagged segment.
        if segments.is_empty() && !text.is_empty() {
            segments.push(RawSegment {
                start: 0.0,
                end: None,
                speaker: None,
                text: text.clone(),
            });
        }

        info!(
            "Transcription complete: {} chars, {} segments",
            text.len(),
            segments.len()
        );

        Ok(RawTranscript { text, segments })
    }
}
