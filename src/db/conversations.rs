//! Conversation records: one row per processed call, transcript and
//! analysis stored as JSON columns. The single-row insert is the
//! all-or-nothing persistence unit for a pipeline task.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::classification::AnalysisResult;
use crate::transcription::Transcript;

/// A conversation ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub user_id: i64,
    pub file_path: String,
    pub transcript: Transcript,
    pub analysis: AnalysisResult,
}

/// A persisted conversation.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: i64,
    pub user_id: i64,
    pub file_path: String,
    pub transcript: Transcript,
    pub analysis: AnalysisResult,
    pub created_at: String,
}

impl ConversationRecord {
    fn from_row(
        id: i64,
        user_id: i64,
        file_path: String,
        transcript_json: String,
        analysis_json: String,
        created_at: String,
    ) -> Result<Self> {
        Ok(Self {
            id,
            user_id,
            file_path,
            transcript: serde_json::from_str(&transcript_json)
                .context("Failed to decode stored transcript")?,
            analysis: serde_json::from_str(&analysis_json)
                .context("Failed to decode stored analysis")?,
            created_at,
        })
    }
}

pub struct ConversationRepository;

impl ConversationRepository {
    pub fn insert(conn: &Connection, conversation: &NewConversation) -> Result<i64> {
        let transcript_json = serde_json::to_string(&conversation.transcript)
            .context("Failed to encode transcript")?;
        let analysis_json = serde_json::to_string(&conversation.analysis)
            .context("Failed to encode analysis")?;

        conn.execute(
            "INSERT INTO conversations (user_id, file_path, transcript, analysis)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation.user_id,
                conversation.file_path,
                transcript_json,
                analysis_json
            ],
        )
        .context("Failed to insert conversation")?;

        Ok(conn.last_insert_rowid())
    }

    /// Fetch one conversation, scoped to its owner. A foreign id reads the
    /// same as a missing one.
    pub fn get_for_user(
        conn: &Connection,
        id: i64,
        user_id: i64,
    ) -> Result<Option<ConversationRecord>> {
        let row = conn
            .query_row(
                "SELECT id, user_id, file_path, transcript, analysis, created_at
                 FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query conversation")?;

        row.map(|(id, user_id, file_path, transcript, analysis, created_at)| {
            ConversationRecord::from_row(id, user_id, file_path, transcript, analysis, created_at)
        })
        .transpose()
    }

    /// List a user's conversations, newest first, optionally narrowed by a
    /// free-text match over the stored transcript and a created_at range.
    pub fn list_for_user(
        conn: &Connection,
        user_id: i64,
        query: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>> {
        let mut sql = "SELECT id, user_id, file_path, transcript, analysis, created_at
             FROM conversations WHERE user_id = ?"
            .to_string();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(q) = query {
            sql.push_str(" AND transcript LIKE ?");
            params.push(Box::new(format!("%{}%", q)));
        }

        if let Some(from) = date_from {
            sql.push_str(" AND created_at >= ?");
            params.push(Box::new(from.to_string()));
        }

        if let Some(to) = date_to {
            sql.push_str(" AND created_at <= ?");
            params.push(Box::new(to.to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        params.push(Box::new(limit));

        let mut stmt = conn.prepare(&sql).context("Failed to prepare list query")?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .context("Failed to execute list query")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read conversation rows")?;

        rows.into_iter()
            .map(|(id, user_id, file_path, transcript, analysis, created_at)| {
                ConversationRecord::from_row(
                    id, user_id, file_path, transcript, analysis, created_at,
                )
            })
            .collect()
    }

    pub fn count_for_user(conn: &Connection, user_id: i64) -> Result<i64> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM conversations WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .context("Failed to count conversations")?;

        Ok(count)
    }
}
