//! Search and aggregation over persisted conversations.
//!
//! This is the business layer shared by the REST API and the CLI. Date and
//! free-text narrowing happen in SQL; phase and sentiment live inside the
//! analysis JSON, so those filters run over the decoded records.

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::{ConversationRecord, ConversationRepository};

/// How many rows to scan when a filter can only be applied after decoding.
const FILTER_SCAN_LIMIT: usize = 500;

/// Cap for full-account aggregation scans.
const STATS_SCAN_LIMIT: usize = 10_000;

/// Filters for searching a user's conversations.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConversationFilters {
    /// Text query matched against the stored transcript
    pub query: Option<String>,
    /// Filter by start date (YYYY-MM-DD format)
    pub start_date: Option<String>,
    /// Filter by end date (YYYY-MM-DD format)
    pub end_date: Option<String>,
    /// Keep only conversations that contain this phase
    pub phase: Option<String>,
    /// Keep only conversations that contain this sentiment
    pub sentiment: Option<String>,
    /// Maximum number of results
    pub limit: usize,
}

impl ConversationFilters {
    pub fn new() -> Self {
        Self {
            limit: 20,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_date_range(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.start_date = from;
        self.end_date = to;
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_sentiment(mut self, sentiment: impl Into<String>) -> Self {
        self.sentiment = Some(sentiment.into());
        self
    }

    pub fn has_filters(&self) -> bool {
        self.query.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.phase.is_some()
            || self.sentiment.is_some()
    }

    fn needs_decoded_scan(&self) -> bool {
        self.phase.is_some() || self.sentiment.is_some()
    }
}

/// A search hit: enough to list and identify a conversation without
/// shipping the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub file_path: String,
    pub created_at: String,
    pub duration_seconds: f64,
    pub segment_count: usize,
    pub total_turns: usize,
}

impl From<&ConversationRecord> for ConversationSummary {
    fn from(record: &ConversationRecord) -> Self {
        Self {
            id: record.id,
            file_path: record.file_path.clone(),
            created_at: record.created_at.clone(),
            duration_seconds: record.analysis.summary.duration,
            segment_count: record.transcript.segments.len(),
            total_turns: record.analysis.turn_taking.total_turns,
        }
    }
}

/// Aggregate view over everything a user has processed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total_conversations: usize,
    pub total_duration: f64,
    pub phase_distribution: BTreeMap<String, f64>,
    pub sentiment_summary: BTreeMap<String, i64>,
    pub total_turns: usize,
    pub average_turns: f64,
}

/// Search one user's conversations.
pub fn search(
    conn: &Connection,
    user_id: i64,
    filters: &ConversationFilters,
) -> Result<Vec<ConversationSummary>> {
    let sql_limit = if filters.needs_decoded_scan() {
        FILTER_SCAN_LIMIT
    } else {
        filters.limit
    };

    let records = ConversationRepository::list_for_user(
        conn,
        user_id,
        filters.query.as_deref(),
        filters.start_date.as_deref(),
        filters.end_date.as_deref(),
        sql_limit,
    )?;

    Ok(records
        .iter()
        .filter(|record| matches_phase(record, filters.phase.as_deref()))
        .filter(|record| matches_sentiment(record, filters.sentiment.as_deref()))
        .take(filters.limit)
        .map(ConversationSummary::from)
        .collect())
}

/// Aggregate stats across one user's conversations.
pub fn stats(conn: &Connection, user_id: i64) -> Result<ConversationStats> {
    let records =
        ConversationRepository::list_for_user(conn, user_id, None, None, None, STATS_SCAN_LIMIT)?;

    let mut stats = ConversationStats {
        total_conversations: records.len(),
        ..ConversationStats::default()
    };

    for record in &records {
        stats.total_duration += record.analysis.summary.duration;
        stats.total_turns += record.analysis.turn_taking.total_turns;

        for (phase, seconds) in &record.analysis.summary.phase_distribution {
            *stats.phase_distribution.entry(phase.clone()).or_insert(0.0) += seconds;
        }
        for (sentiment, count) in &record.analysis.summary.sentiment_summary {
            *stats
                .sentiment_summary
                .entry(sentiment.clone())
                .or_insert(0) += count;
        }
    }

    stats.average_turns = if records.is_empty() {
        0.0
    } else {
        stats.total_turns as f64 / records.len() as f64
    };

    Ok(stats)
}

/// A record matches a phase filter when any of its segments was classified
/// with that phase.
fn matches_phase(record: &ConversationRecord, phase: Option<&str>) -> bool {
    match phase {
        None => true,
        Some(phase) => record
            .analysis
            .segments
            .iter()
            .any(|s| s.classification.phase == phase),
    }
}

fn matches_sentiment(record: &ConversationRecord, sentiment: Option<&str>) -> bool {
    match sentiment {
        None => true,
        Some(sentiment) => record
            .analysis
            .segments
            .iter()
            .any(|s| s.classification.sentiment == sentiment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TurnTakingSummary;
    use crate::classification::{
        AnalysisResult, AnalysisSummary, Classification, ClassifiedSegment,
    };
    use crate::db::{migrate, NewConversation};
    use crate::transcription::{Transcript, TranscriptSegment};

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn conversation(
        user_id: i64,
        text: &str,
        phase: &str,
        sentiment: &str,
        turns: usize,
    ) -> NewConversation {
        let transcript = Transcript {
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: Some(10.0),
                speaker: "agent".to_string(),
                text: text.to_string(),
            }],
            speakers: vec!["agent".to_string()],
        };
        let mut phase_distribution = BTreeMap::new();
        phase_distribution.insert(phase.to_string(), 10.0);
        let mut sentiment_summary = BTreeMap::new();
        sentiment_summary.insert(sentiment.to_string(), 1);

        NewConversation {
            user_id,
            file_path: "/tmp/call.wav".to_string(),
            transcript,
            analysis: AnalysisResult {
                segments: vec![ClassifiedSegment {
                    start: 0.0,
                    classification: Classification {
                        phase: phase.to_string(),
                        sentiment: sentiment.to_string(),
                    },
                }],
                summary: AnalysisSummary {
                    duration: 10.0,
                    phase_distribution,
                    sentiment_summary,
                },
                turn_taking: TurnTakingSummary {
                    total_turns: turns,
                    ..TurnTakingSummary::default()
                },
            },
        }
    }

    fn seed(conn: &Connection) {
        ConversationRepository::insert(
            conn,
            &conversation(1, "pricing deep dive", "closing", "positive", 4),
        )
        .unwrap();
        ConversationRepository::insert(
            conn,
            &conversation(1, "intro call", "greeting", "neutral", 2),
        )
        .unwrap();
        ConversationRepository::insert(
            conn,
            &conversation(2, "someone else's pricing call", "closing", "negative", 6),
        )
        .unwrap();
    }

    #[test]
    fn test_search_without_filters_returns_user_records() {
        let conn = setup_test_db();
        seed(&conn);

        let results = search(&conn, 1, &ConversationFilters::new()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.segment_count == 1));
    }

    #[test]
    fn test_search_text_query_is_user_scoped() {
        let conn = setup_test_db();
        seed(&conn);

        let results = search(&conn, 1, &ConversationFilters::new().with_query("pricing")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_turns, 4);
    }

    #[test]
    fn test_search_phase_filter() {
        let conn = setup_test_db();
        seed(&conn);

        let results = search(&conn, 1, &ConversationFilters::new().with_phase("closing")).unwrap();
        assert_eq!(results.len(), 1);

        let none = search(
            &conn,
            1,
            &ConversationFilters::new().with_phase("objection_handling"),
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_search_sentiment_filter() {
        let conn = setup_test_db();
        seed(&conn);

        let results =
            search(&conn, 1, &ConversationFilters::new().with_sentiment("positive")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].duration_seconds, 10.0);
    }

    #[test]
    fn test_search_combined_filters() {
        let conn = setup_test_db();
        seed(&conn);

        let results = search(
            &conn,
            1,
            &ConversationFilters::new()
                .with_query("call")
                .with_phase("greeting")
                .with_sentiment("neutral"),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_turns, 2);
    }

    #[test]
    fn test_search_limit_applies_after_decoded_filters() {
        let conn = setup_test_db();
        for i in 0..5 {
            ConversationRepository::insert(
                &conn,
                &conversation(1, &format!("call {i}"), "discovery", "neutral", 1),
            )
            .unwrap();
        }

        let results = search(
            &conn,
            1,
            &ConversationFilters::new().with_phase("discovery").with_limit(3),
        )
        .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_stats_aggregation() {
        let conn = setup_test_db();
        seed(&conn);

        let stats = stats(&conn, 1).unwrap();
        assert_eq!(stats.total_conversations, 2);
        assert_eq!(stats.total_duration, 20.0);
        assert_eq!(stats.total_turns, 6);
        assert_eq!(stats.average_turns, 3.0);
        assert_eq!(stats.phase_distribution["closing"], 10.0);
        assert_eq!(stats.phase_distribution["greeting"], 10.0);
        assert_eq!(stats.sentiment_summary["positive"], 1);
        assert_eq!(stats.sentiment_summary["neutral"], 1);
        assert!(!stats.sentiment_summary.contains_key("negative"));
    }

    #[test]
    fn test_stats_for_empty_account() {
        let conn = setup_test_db();

        let stats = stats(&conn, 9).unwrap();
        assert_eq!(stats.total_conversations, 0);
        assert_eq!(stats.average_turns, 0.0);
        assert!(stats.phase_distribution.is_empty());
    }

    #[test]
    fn test_filters_builder() {
        let filters = ConversationFilters::new()
            .with_limit(50)
            .with_query("hello")
            .with_date_range(Some("2024-01-01".into()), Some("2024-12-31".into()))
            .with_phase("closing")
            .with_sentiment("positive");

        assert_eq!(filters.limit, 50);
        assert!(filters.has_filters());
        assert!(!ConversationFilters::new().has_filters());
    }
}
