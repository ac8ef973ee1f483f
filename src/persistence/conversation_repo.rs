//! Conversation repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::conversation::{Conversation, ConversationUpdate};
use crate::{AppError, Result};

use super::db::Database;
use super::parse_timestamp;

/// Repository wrapper around `SQLite` for conversation records.
#[derive(Clone)]
pub struct ConversationRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: String,
    owner_user_id: String,
    title: String,
    resume_token: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            owner_user_id: self.owner_user_id,
            title: self.title,
            resume_token: self.resume_token,
        })
    }
}

impl ConversationRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new conversation record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, conversation: &Conversation) -> Result<Conversation> {
        sqlx::query(
            "INSERT INTO conversation (id, owner_user_id, title, resume_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&conversation.id)
        .bind(&conversation.owner_user_id)
        .bind(&conversation.title)
        .bind(&conversation.resume_token)
        .bind(conversation.created_at.to_rfc3339())
        .bind(conversation.updated_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;

        Ok(conversation.clone())
    }

    /// Retrieve a conversation by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the conversation does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<Conversation> {
        let row: Option<ConversationRow> = sqlx::query_as(
            "SELECT id, owner_user_id, title, resume_token, created_at, updated_at
             FROM conversation WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.ok_or_else(|| AppError::NotFound("session not found".into()))?
            .into_conversation()
    }

    /// Retrieve a conversation only if `owner_user_id` owns it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if it does not exist or belongs to
    /// another user; the two cases are indistinguishable to the caller.
    pub async fn get_owned(&self, id: &str, owner_user_id: &str) -> Result<Conversation> {
        let conversation = self.get_by_id(id).await?;
        if conversation.is_owned_by(owner_user_id) {
            Ok(conversation)
        } else {
            Err(AppError::NotFound("session not found".into()))
        }
    }

    /// List a user's conversations, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_owner(&self, owner_user_id: &str) -> Result<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            "SELECT id, owner_user_id, title, resume_token, created_at, updated_at
             FROM conversation WHERE owner_user_id = ?1
             ORDER BY updated_at DESC, rowid DESC",
        )
        .bind(owner_user_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(ConversationRow::into_conversation)
            .collect()
    }

    /// Record the resume token produced by a completed turn.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no row was updated.
    pub async fn apply_update(&self, id: &str, update: &ConversationUpdate) -> Result<()> {
        let result = sqlx::query(
            "UPDATE conversation SET resume_token = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(&update.resume_token)
        .bind(update.updated_at.to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("session not found".into()));
        }
        Ok(())
    }

    /// Delete a conversation and all of its messages.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if either delete fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM message WHERE conversation_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM conversation WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
