//! Storage seam used by the chat bridge.
//!
//! The bridge touches conversation storage through exactly three
//! operations; anything else (listing, deletion, profiles) belongs to the
//! HTTP layer and the repositories directly.

use std::future::Future;
use std::pin::Pin;

use crate::models::conversation::{Conversation, ConversationUpdate};
use crate::models::message::MessageRole;
use crate::Result;

/// Boxed future returned by [`ConversationStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Conversation storage as seen by a turn.
pub trait ConversationStore: Send + Sync {
    /// Read a conversation (including its resume token).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`](crate::AppError::NotFound) for unknown ids.
    fn get_conversation<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Conversation>;

    /// Append a message to a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the write fails.
    fn append_message<'a>(
        &'a self,
        conversation_id: &'a str,
        role: MessageRole,
        text: &'a str,
    ) -> StoreFuture<'a, ()>;

    /// Record a new resume token and activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the write fails.
    fn update_conversation<'a>(
        &'a self,
        id: &'a str,
        update: ConversationUpdate,
    ) -> StoreFuture<'a, ()>;
}
