use anyhow::{Context, Result};
use rusqlite::Connection;

pub mod conversations;
pub mod store;

pub use conversations::{ConversationRecord, ConversationRepository, NewConversation};
pub use store::{ConversationStore, SqliteConversationStore};

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            transcript TEXT NOT NULL,
            analysis TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create conversations table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conversations_user_created
         ON conversations(user_id, created_at DESC)",
        [],
    )
    .context("Failed to create index on user_id/created_at")?;

    Ok(())
}
