//! Async seam between the pipeline and SQLite. Inserts run on the blocking
//! pool against a fresh connection.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::conversations::{ConversationRepository, NewConversation};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist one conversation atomically, returning the record id.
    async fn insert(&self, conversation: NewConversation) -> Result<i64>;
}

/// Production store: a blocking SQLite write per insert, moved off the
/// async runtime.
pub struct SqliteConversationStore;

impl SqliteConversationStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SqliteConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn insert(&self, conversation: NewConversation) -> Result<i64> {
        tokio::task::spawn_blocking(move || {
            let conn = super::init_db()?;
            ConversationRepository::insert(&conn, &conversation)
        })
        .await
        .context("Database task panicked")?
    }
}
