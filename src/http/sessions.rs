//! Chat session (conversation) management handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::{AppState, CurrentUser};
use crate::models::conversation::Conversation;
use crate::models::message::Message;
use crate::persistence::conversation_repo::ConversationRepo;
use crate::persistence::message_repo::MessageRepo;
use crate::Result;

/// Session as listed to its owner.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for SessionSummary {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            title: c.title,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// `POST /api/sessions`
///
/// # Errors
///
/// Returns `AppError::Db` if the insert fails.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let repo = ConversationRepo::new(Arc::clone(&state.db));
    let conversation = repo.create(&Conversation::new(user.id.clone())).await?;
    info!(user_id = user.id, conversation_id = conversation.id, "session created");
    Ok(Json(json!({ "id": conversation.id, "title": conversation.title })))
}

/// `GET /api/sessions`, newest activity first.
///
/// # Errors
///
/// Returns `AppError::Db` if the query fails.
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let repo = ConversationRepo::new(Arc::clone(&state.db));
    let sessions: Vec<SessionSummary> = repo
        .list_for_owner(&user.id)
        .await?
        .into_iter()
        .map(SessionSummary::from)
        .collect();
    Ok(Json(json!({ "sessions": sessions })))
}

/// `DELETE /api/sessions/{id}`
///
/// # Errors
///
/// Returns `AppError::NotFound` when the session is missing or owned by
/// someone else.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let repo = ConversationRepo::new(Arc::clone(&state.db));
    repo.get_owned(&id, &user.id).await?;
    repo.delete(&id).await?;
    info!(user_id = user.id, conversation_id = id, "session deleted");
    Ok(Json(json!({ "ok": true })))
}

/// `GET /api/sessions/{id}/messages`, oldest first.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the session is missing or owned by
/// someone else.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    ConversationRepo::new(Arc::clone(&state.db))
        .get_owned(&id, &user.id)
        .await?;
    let messages: Vec<Message> = MessageRepo::new(Arc::clone(&state.db))
        .list_for_conversation(&id)
        .await?;
    Ok(Json(json!({ "messages": messages })))
}
