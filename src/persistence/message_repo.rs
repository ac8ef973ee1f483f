//! Message repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::message::{Message, MessageRole};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_timestamp;

/// Repository for chat message records.
#[derive(Clone)]
pub struct MessageRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        Ok(Message {
            role: parse_role(&self.role)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            id: self.id,
            conversation_id: self.conversation_id,
            content: self.content,
        })
    }
}

fn parse_role(s: &str) -> Result<MessageRole> {
    match s {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        other => Err(AppError::Db(format!("invalid message role: {other}"))),
    }
}

impl MessageRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails (including an unknown
    /// conversation id, rejected by the foreign key).
    pub async fn insert(&self, message: &Message) -> Result<Message> {
        sqlx::query(
            "INSERT INTO message (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(message.clone())
    }

    /// List a conversation's messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, conversation_id, role, content, created_at
             FROM message WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
