//! Conversation model.
//!
//! A conversation is what the HTTP surface calls a chat *session*: an owned
//! thread of messages plus the agent provider's opaque resume token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title assigned to freshly created conversations.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Conversation entity persisted in `SQLite`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique record identifier.
    pub id: String,
    /// Owning user identifier as issued by the identity provider.
    pub owner_user_id: String,
    /// Display title.
    pub title: String,
    /// Provider-assigned resume token from the most recent completed turn.
    pub resume_token: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Construct a new conversation with no resume token.
    #[must_use]
    pub fn new(owner_user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_user_id,
            title: DEFAULT_TITLE.into(),
            resume_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` owns this conversation.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }
}

/// End-of-turn write applied to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationUpdate {
    /// Resume token observed in the turn's completion event.
    pub resume_token: String,
    /// Timestamp recorded as `updated_at`.
    pub updated_at: DateTime<Utc>,
}

impl ConversationUpdate {
    /// Build an update stamped with the current time.
    #[must_use]
    pub fn now(resume_token: String) -> Self {
        Self {
            resume_token,
            updated_at: Utc::now(),
        }
    }
}
