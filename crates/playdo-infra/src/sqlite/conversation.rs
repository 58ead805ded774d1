//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `playdo-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader pool
//! and writes in transactions on the writer pool.

use chrono::{DateTime, SecondsFormat, Utc};
use playdo_core::conversation::repository::ConversationRepository;
use playdo_types::conversation::{Conversation, ConversationId, ConversationSummary};
use playdo_types::error::RepositoryError;
use playdo_types::message::{ContentBlock, Message, MessageRole, StoredMessage};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for the `conversations` table.
struct ConversationRow {
    id: String,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self, messages: Vec<StoredMessage>) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_conversation_id(&self.id)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            messages,
        })
    }

    fn into_summary(self, message_count: i64) -> Result<ConversationSummary, RepositoryError> {
        Ok(ConversationSummary {
            id: parse_conversation_id(&self.id)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            message_count: message_count as u32,
        })
    }
}

/// Internal row type for the `messages` table.
struct MessageRow {
    id: String,
    conversation_id: String,
    sequence_number: i64,
    role: String,
    content: String,
    editor_code: Option<String>,
    stdout: Option<String>,
    stderr: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sequence_number: row.try_get("sequence_number")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            editor_code: row.try_get("editor_code")?,
            stdout: row.try_get("stdout")?,
            stderr: row.try_get("stderr")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_stored(self) -> Result<StoredMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let content: Vec<ContentBlock> = serde_json::from_str(&self.content)
            .map_err(|e| RepositoryError::Query(format!("invalid message content: {e}")))?;
        let message = Message::new(role, content, self.editor_code, self.stdout, self.stderr)
            .map_err(|e| RepositoryError::Query(format!("stored message {id} is invalid: {e}")))?;

        Ok(StoredMessage {
            id,
            conversation_id: parse_conversation_id(&self.conversation_id)?,
            sequence_number: self.sequence_number as u32,
            message,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_conversation_id(s: &str) -> Result<ConversationId, RepositoryError> {
    s.parse()
        .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        sqlx::query("INSERT INTO conversations (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(conversation.id.to_string())
            .bind(format_datetime(&conversation.created_at))
            .bind(format_datetime(&conversation.updated_at))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.message().contains("UNIQUE") {
                        return RepositoryError::Conflict(format!(
                            "conversation {} already exists",
                            conversation.id
                        ));
                    }
                }
                query_error(e)
            })?;

        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT id, created_at, updated_at FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let conversation_row = ConversationRow::from_row(&row).map_err(query_error)?;
        let messages = self.list_messages(id).await?;
        Ok(Some(conversation_row.into_conversation(messages)?))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.created_at, c.updated_at, COUNT(m.id) AS message_count
               FROM conversations c
               LEFT JOIN messages m ON m.conversation_id = c.id
               GROUP BY c.id
               ORDER BY c.updated_at DESC, c.id DESC"#,
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_count: i64 = row.try_get("message_count").map_err(query_error)?;
            let conversation_row = ConversationRow::from_row(row).map_err(query_error)?;
            summaries.push(conversation_row.into_summary(message_count)?);
        }

        Ok(summaries)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sequence_number: u32,
        message: &Message,
    ) -> Result<StoredMessage, RepositoryError> {
        let stored = StoredMessage {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            sequence_number,
            message: message.clone(),
            created_at: Utc::now(),
        };
        let content = serde_json::to_string(message.content())
            .map_err(|e| RepositoryError::Query(format!("failed to encode content: {e}")))?;
        let created_at = format_datetime(&stored.created_at);

        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let exists = sqlx::query("SELECT 1 FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_error)?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        // Insert only if `sequence_number` is still the next free position
        let result = sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, sequence_number, role, content, editor_code, stdout, stderr, created_at)
               SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
               WHERE (SELECT COALESCE(MAX(sequence_number), -1) + 1 FROM messages WHERE conversation_id = ?) = ?"#,
        )
        .bind(stored.id.to_string())
        .bind(conversation_id.to_string())
        .bind(sequence_number as i64)
        .bind(message.role().to_string())
        .bind(&content)
        .bind(message.editor_code())
        .bind(message.stdout())
        .bind(message.stderr())
        .bind(&created_at)
        .bind(conversation_id.to_string())
        .bind(sequence_number as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "sequence number {sequence_number} already taken in conversation {conversation_id}"
                    ));
                }
            }
            query_error(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "sequence number {sequence_number} is not the next position in conversation {conversation_id}"
            )));
        }

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&created_at)
            .bind(conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;

        tracing::debug!(
            conversation_id = %conversation_id,
            sequence_number,
            role = %message.role(),
            "Message appended"
        );

        Ok(stored)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY sequence_number ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row = MessageRow::from_row(row).map_err(query_error)?;
            messages.push(msg_row.into_stored()?);
        }

        Ok(messages)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
