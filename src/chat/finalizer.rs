//! Turn finalizer.
//!
//! Runs once after the publisher loop exits. Performs two independent,
//! best-effort writes; failures are logged and never retried, since the
//! client stream has already closed.

use tracing::{error, info};

use super::publisher::TurnOutcome;
use super::store::ConversationStore;
use crate::models::conversation::ConversationUpdate;
use crate::models::message::MessageRole;

/// Which finalization writes succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// The assistant message was stored.
    pub message_saved: bool,
    /// The resume token was stored.
    pub token_saved: bool,
}

/// Persist the results of a finished turn.
///
/// 1. A non-empty transcript is appended as an assistant message.
/// 2. A captured resume token is written onto the conversation with a
///    fresh `updated_at`. Without one the stored token is left untouched.
pub async fn finalize_turn(
    store: &dyn ConversationStore,
    conversation_id: &str,
    outcome: &TurnOutcome,
    turn_id: &str,
) -> FinalizeReport {
    let mut report = FinalizeReport::default();

    if !outcome.transcript.is_empty() {
        let text = outcome.transcript.text();
        match store
            .append_message(conversation_id, MessageRole::Assistant, &text)
            .await
        {
            Ok(()) => report.message_saved = true,
            Err(err) => {
                error!(turn_id, conversation_id, %err, "finalizer: failed to store assistant message");
            }
        }
    }

    if let Some(ref token) = outcome.resume_token {
        match store
            .update_conversation(conversation_id, ConversationUpdate::now(token.clone()))
            .await
        {
            Ok(()) => report.token_saved = true,
            Err(err) => {
                error!(turn_id, conversation_id, %err, "finalizer: failed to store resume token");
            }
        }
    }

    info!(
        turn_id,
        conversation_id,
        exit = ?outcome.exit,
        fragments = outcome.transcript.len(),
        message_saved = report.message_saved,
        token_saved = report.token_saved,
        "turn finalized"
    );

    report
}
