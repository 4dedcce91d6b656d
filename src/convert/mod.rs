//! Audio normalization before transcription. Uploaded recordings arrive as
//! wav/mp3/m4a; the speech-to-text engines want 16 kHz mono WAV.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

#[async_trait]
pub trait AudioConverter: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Produce a normalized WAV copy of `input` and return its path.
    async fn convert(&self, input: &Path) -> Result<PathBuf>;
}

/// FFmpeg-backed converter writing into a dedicated output directory.
pub struct FfmpegConverter {
    output_dir: PathBuf,
}

impl FfmpegConverter {
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&output_dir)
            .context("Failed to create conversion output directory")?;
        Ok(Self { output_dir })
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    fn name(&self) -> &'static str {
        "FFmpeg"
    }

    fn is_available(&self) -> bool {
        which::which("ffmpeg").is_ok()
    }

    async fn convert(&self, input: &Path) -> Result<PathBuf> {
        if !self.is_available() {
            bail!(
                "FFmpeg is required to convert uploads but was not found.\n\
                 Install FFmpeg:\n\
                 - macOS: brew install ffmpeg\n\
                 - Ubuntu/Debian: sudo apt install ffmpeg\n\
                 - Arch: sudo pacman -S ffmpeg"
            );
        }

        let filename = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let output = self.output_dir.join(format!("{}.wav", filename));

        debug!("Converting {:?} -> {:?}", input, output);

        // -vn: drop any video stream
        // -ar 16000 -ac 1: 16 kHz mono, what the speech engines expect
        // -y: overwrite without asking
        let result = Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-vn"])
            .args(["-ar", "16000"])
            .args(["-ac", "1"])
            .args(["-y"])
            .arg(&output)
            .output()
            .await
            .context("Failed to run FFmpeg")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!("FFmpeg conversion failed: {}", stderr.trim());
        }

        if !output.exists() {
            bail!("FFmpeg did not produce an output file");
        }

        info!("Converted {:?} for transcription", input);

        Ok(output)
    }
}
