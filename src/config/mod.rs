use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub pipeline: PipelineConfig,
    pub analysis: AnalysisConfig,
    pub transcription: TranscriptionConfig,
    pub classification: ClassificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Upper bound for a single upload request body, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token -> user id. Empty table means every request is rejected.
    pub tokens: HashMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How many uploads may be processed at once; admitted tasks past this
    /// bound wait their turn at stage 0.
    pub max_concurrent_tasks: usize,
    /// Minutes a finished task stays pollable before the sweeper drops it.
    pub retention_minutes: u64,
    pub convert_timeout_seconds: u64,
    pub transcribe_timeout_seconds: u64,
    pub classify_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Silence gap (seconds) that splits consecutive same-speaker segments
    /// into separate turns.
    pub silence_threshold_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub provider: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub command_path: Option<String>,
    pub model_path: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub provider: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 4,
            retention_minutes: 60,
            convert_timeout_seconds: 120,
            transcribe_timeout_seconds: 1800,
            classify_timeout_seconds: 120,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            silence_threshold_seconds: 5.0,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: Some("remote-api".to_string()),
            api_endpoint: None,
            api_key: None,
            command_path: None,
            model_path: None,
            language: Some("en".to_string()),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            provider: Some("keyword".to_string()),
            api_endpoint: None,
            api_key: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.server.port, 8000);
        assert_eq!(parsed.pipeline.max_concurrent_tasks, 4);
        assert_eq!(parsed.pipeline.retention_minutes, 60);
        assert_eq!(parsed.analysis.silence_threshold_seconds, 5.0);
        assert_eq!(parsed.transcription.provider.as_deref(), Some("remote-api"));
        assert_eq!(parsed.classification.provider.as_deref(), Some("keyword"));
    }

    #[test]
    fn test_partial_config_fills_missing_sections() {
        let parsed: Config = toml::from_str(
            r#"
            [server]
            port = 9100

            [auth.tokens]
            "dev-token" = 7
            "#,
        )
        .unwrap();

        assert_eq!(parsed.server.port, 9100);
        assert_eq!(parsed.auth.tokens.get("dev-token"), Some(&7));
        assert_eq!(parsed.pipeline.max_concurrent_tasks, 4);
        assert_eq!(parsed.transcription.language.as_deref(), Some("en"));
    }
}
