//! Pipeline stage and task status types.

use serde::{Deserialize, Serialize};

/// Stage of the conversation processing pipeline. Stages only ever advance;
/// failures keep the last stage reached and flip the status instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Converted,
    Transcribed,
    Analyzed,
    Completed,
}

impl PipelineStage {
    /// Numeric stage reported to pollers (0 through 4).
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Received => 0,
            Self::Converted => 1,
            Self::Transcribed => 2,
            Self::Analyzed => 3,
            Self::Completed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Converted => "converted",
            Self::Transcribed => "transcribed",
            Self::Analyzed => "analyzed",
            Self::Completed => "completed",
        }
    }
}

/// Execution status of a task, orthogonal to the stage it reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Terminal statuses never change again and become eligible for pruning.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}
