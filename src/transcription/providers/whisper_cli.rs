use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::super::{RawSegment, RawTranscript, SpeechToText};

/// Local whisper.cpp-style CLI. Produces timestamped lines but no speaker
/// tags; downstream labeling folds everything onto one speaker.
#[derive(Debug)]
pub struct WhisperCliProvider {
    command_path: String,
    model_path: Option<String>,
    language: String,
}

impl WhisperCliProvider {
    pub fn new(
        command_path: Option<String>,
        model_path: Option<String>,
        language: String,
    ) -> Result<Self> {
        let command_path = command_path.unwrap_or_else(|| "whisper-cli".to_string());

        info!("Initialized whisper CLI provider: {}", command_path);

        Ok(Self {
            command_path,
            model_path,
            language,
        })
    }
}

#[async_trait]
impl SpeechToText for WhisperCliProvider {
    fn name(&self) -> &'static str {
        "Whisper CLI"
    }

    fn is_available(&self) -> bool {
        which::which(&self.command_path).is_ok()
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<RawTranscript> {
        if !self.is_available() {
            bail!(
                "whisper CLI not found at '{}'. Install whisper.cpp or set transcription.command_path",
                self.command_path
            );
        }

        info!("Transcribing audio file via whisper CLI: {:?}", audio_path);

        let mut command = Command::new(&self.command_path);
        command.arg("-f").arg(audio_path);
        command.arg("-l").arg(&self.language);
        if let Some(model) = &self.model_path {
            command.arg("-m").arg(model);
        }

        let output = command
            .output()
            .await
            .context("Failed to run whisper CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("whisper CLI failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let transcript = parse_timestamped_output(&stdout)?;

        info!(
            "Transcription complete: {} segments",
            transcript.segments.len()
        );

        Ok(transcript)
    }
}

/// Parse `[HH:MM:SS.mmm --> HH:MM:SS.mmm]  text` lines. Lines that do not
/// match (progress noise, blank lines) are skipped.
fn parse_timestamped_output(stdout: &str) -> Result<RawTranscript> {
    let line_re = Regex::new(
        r"^\[(\d{2}):(\d{2}):(\d{2})[.,](\d{3})\s+-->\s+(\d{2}):(\d{2}):(\d{2})[.,](\d{3})\]\s*(.*)$",
    )
    .context("Failed to compile whisper output pattern")?;

    let mut segments = Vec::new();
    let mut full_text = String::new();

    for line in stdout.lines() {
        let Some(caps) = line_re.captures(line.trim()) else {
            debug!("Skipping non-segment line: {}", line);
            continue;
        };

        let start = timestamp_seconds(&caps[1], &caps[2], &caps[3], &caps[4])?;
        let end = timestamp_seconds(&caps[5], &caps[6], &caps[7], &caps[8])?;
        let text = caps[9].trim().to_string();
        if text.is_empty() {
            continue;
        }

        if !full_text.is_empty() {
            full_text.push(' ');
        }
        full_text.push_str(&text);

        segments.push(RawSegment {
            start,
            end: Some(end),
            speaker: None,
            text,
        });
    }

    Ok(RawTranscript {
        text: full_text,
        segments,
    })
}

fn timestamp_seconds(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Result<f64> {
    let hours: f64 = hours.parse().context("Bad hour field in timestamp")?;
    let minutes: f64 = minutes.parse().context("Bad minute field in timestamp")?;
    let seconds: f64 = seconds.parse().context("Bad second field in timestamp")?;
    let millis: f64 = millis.parse().context("Bad millisecond field in timestamp")?;
    Ok(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamped_lines() {
        let stdout = "\
[00:00:00.000 --> 00:00:02.500]  Hello, thanks for taking my call.
[00:00:03.000 --> 00:00:04.120]  Sure, what's this about?
";
        let transcript = parse_timestamped_output(stdout).unwrap();

        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].start, 0.0);
        assert_eq!(transcript.segments[0].end, Some(2.5));
        assert_eq!(transcript.segments[1].start, 3.0);
        assert_eq!(transcript.segments[1].end, Some(4.12));
        assert_eq!(
            transcript.text,
            "Hello, thanks for taking my call. Sure, what's this about?"
        );
        assert!(transcript.segments.iter().all(|s| s.speaker.is_none()));
    }

    #[test]
    fn test_noise_lines_are_skipped() {
        let stdout = "\
whisper_init_from_file_with_params_no_state: loading model
[00:01:02.750 --> 00:01:03.000]  Right.

main: processing audio
";
        let transcript = parse_timestamped_output(stdout).unwrap();

        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].start, 62.75);
        assert_eq!(transcript.segments[0].text, "Right.");
    }

    #[test]
    fn test_comma_millisecond_separator() {
        let stdout = "[00:00:01,250 --> 00:00:02,000] Okay.";
        let transcript = parse_timestamped_output(stdout).unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].start, 1.25);
    }

    #[test]
    fn test_missing_binary_reported_unavailable() {
        let provider = WhisperCliProvider::new(
            Some("definitely-not-a-real-binary-name".to_string()),
            None,
            "en".to_string(),
        )
        .unwrap();
        assert!(!provider.is_available());
    }
}
