//! Render persisted conversations into the three supported export forms.
//! All renderers are pure functions over a [`ConversationRecord`].

use serde_json::json;
use std::fmt::Write as _;
use thiserror::Error;

use crate::classification::ClassifiedSegment;
use crate::db::ConversationRecord;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}'")]
    UnsupportedFormat(String),
    #[error("no classification found for segment starting at {start}s")]
    MissingClassification { start: f64 },
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Structured,
    Tabular,
    Narrative,
}

impl ExportFormat {
    /// Parse the `format` flag as supplied by callers.
    pub fn from_flag(flag: &str) -> Result<Self, ExportError> {
        match flag {
            "json" => Ok(Self::Structured),
            "csv" => Ok(Self::Tabular),
            "txt" => Ok(Self::Narrative),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Tabular => "text/csv",
            Self::Narrative => "text/plain",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Tabular => "csv",
            Self::Narrative => "txt",
        }
    }
}

pub fn render(record: &ConversationRecord, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Structured => render_structured(record),
        ExportFormat::Tabular => render_tabular(record),
        ExportFormat::Narrative => Ok(render_narrative(record)),
    }
}

/// Full machine-readable export: everything we know about the conversation.
pub fn render_structured(record: &ConversationRecord) -> Result<String, ExportError> {
    let export = json!({
        "transcript": record.transcript,
        "analysis": record.analysis,
        "metadata": {
            "created_at": record.created_at,
            "file_path": record.file_path,
        },
    });
    Ok(serde_json::to_string_pretty(&export)?)
}

/// One CSV row per transcript segment, classification correlated by exact
/// start timestamp. A transcript segment without a matching classified
/// segment is a hard error, never a blank column.
pub fn render_tabular(record: &ConversationRecord) -> Result<String, ExportError> {
    let mut out = String::from("timestamp,speaker,text,phase,sentiment\n");

    for segment in &record.transcript.segments {
        let classified = find_classification(&record.analysis.segments, segment.start)
            .ok_or(ExportError::MissingClassification {
                start: segment.start,
            })?;

        out.push_str(&format!(
            "{:.2},{},{},{},{}\n",
            segment.start,
            csv_field(&segment.speaker),
            csv_field(&segment.text),
            csv_field(&classified.classification.phase),
            csv_field(&classified.classification.sentiment),
        ));
    }

    Ok(out)
}

/// Human-readable report: transcript, rollups, and turn-taking totals.
pub fn render_narrative(record: &ConversationRecord) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Sales Conversation Analysis - ID: {}", record.id);
    let _ = writeln!(out, "Date: {}", record.created_at);
    out.push('\n');

    out.push_str("Transcript:\n");
    for segment in &record.transcript.segments {
        let _ = writeln!(
            out,
            "[{:.2}s] {}: {}",
            segment.start, segment.speaker, segment.text
        );
    }
    out.push('\n');

    out.push_str("Analysis:\n");
    let _ = writeln!(out, "Duration: {:.2}s", record.analysis.summary.duration);
    out.push('\n');

    out.push_str("Phase Distribution:\n");
    for (phase, seconds) in &record.analysis.summary.phase_distribution {
        let _ = writeln!(out, "- {}: {:.2}s", phase, seconds);
    }
    out.push('\n');

    out.push_str("Sentiment Distribution:\n");
    for (sentiment, count) in &record.analysis.summary.sentiment_summary {
        let _ = writeln!(out, "- {}: {}", sentiment, count);
    }
    out.push('\n');

    let turn_taking = &record.analysis.turn_taking;
    out.push_str("Turn Taking Analysis:\n");
    let _ = writeln!(out, "Total Turns: {}", turn_taking.total_turns);
    match &turn_taking.roles {
        Some(roles) => {
            let _ = writeln!(out, "Salesperson Turns: {}", roles.salesperson.turn_count);
            let _ = writeln!(out, "Customer Turns: {}", roles.customer.turn_count);
        }
        // No confident role mapping; report each speaker on its own.
        None => {
            for (speaker, stats) in &turn_taking.per_speaker {
                let _ = writeln!(
                    out,
                    "- {}: {} turns, {:.2}s",
                    speaker, stats.turn_count, stats.total_duration
                );
            }
        }
    }

    out
}

fn find_classification(segments: &[ClassifiedSegment], start: f64) -> Option<&ClassifiedSegment> {
    segments.iter().find(|s| s.start == start)
}

/// Minimal CSV quoting: wrap and double internal quotes only when needed.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
