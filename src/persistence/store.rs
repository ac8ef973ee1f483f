//! `SQLite`-backed [`ConversationStore`].

use std::sync::Arc;

use crate::chat::store::{ConversationStore, StoreFuture};
use crate::models::conversation::{Conversation, ConversationUpdate};
use crate::models::message::{Message, MessageRole};

use super::conversation_repo::ConversationRepo;
use super::db::Database;
use super::message_repo::MessageRepo;

/// Conversation store over the shared `SQLite` pool.
#[derive(Clone)]
pub struct SqliteConversationStore {
    conversations: ConversationRepo,
    messages: MessageRepo,
}

impl SqliteConversationStore {
    /// Create a store over `db`.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            conversations: ConversationRepo::new(Arc::clone(&db)),
            messages: MessageRepo::new(db),
        }
    }
}

impl ConversationStore for SqliteConversationStore {
    fn get_conversation<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Conversation> {
        Box::pin(self.conversations.get_by_id(id))
    }

    fn append_message<'a>(
        &'a self,
        conversation_id: &'a str,
        role: MessageRole,
        text: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let message = Message::new(conversation_id.to_owned(), role, text.to_owned());
            self.messages.insert(&message).await?;
            Ok(())
        })
    }

    fn update_conversation<'a>(
        &'a self,
        id: &'a str,
        update: ConversationUpdate,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.conversations.apply_update(id, &update).await })
    }
}
