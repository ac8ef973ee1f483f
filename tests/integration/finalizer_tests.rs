//! Turn finalizer: best-effort, independent writes.

use std::sync::Arc;

use edu_assistant::chat::finalizer::finalize_turn;
use edu_assistant::chat::publisher::{Transcript, TurnExit, TurnOutcome};
use edu_assistant::chat::store::{ConversationStore, StoreFuture};
use edu_assistant::models::conversation::{Conversation, ConversationUpdate};
use edu_assistant::models::message::MessageRole;
use edu_assistant::persistence::conversation_repo::ConversationRepo;
use edu_assistant::persistence::message_repo::MessageRepo;
use edu_assistant::persistence::store::SqliteConversationStore;
use edu_assistant::AppError;

use super::test_helpers::{memory_db, seed_conversation};

fn outcome(fragments: &[&str], token: Option<&str>) -> TurnOutcome {
    let mut transcript = Transcript::default();
    for fragment in fragments {
        transcript.push(fragment);
    }
    TurnOutcome {
        transcript,
        resume_token: token.map(str::to_owned),
        exit: TurnExit::Completed,
    }
}

#[tokio::test]
async fn stores_transcript_and_token() {
    let db = memory_db().await;
    let conversation = seed_conversation(&db, "alice", Some("sess-old")).await;
    let store = SqliteConversationStore::new(Arc::clone(&db));

    let report = finalize_turn(&store, &conversation.id, &outcome(&["Hi", " there"], Some("sess-new")), "t").await;

    assert!(report.message_saved);
    assert!(report.token_saved);
    let messages = MessageRepo::new(Arc::clone(&db))
        .list_for_conversation(&conversation.id)
        .await
        .expect("list");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, "Hi there");
    let stored = ConversationRepo::new(db).get_by_id(&conversation.id).await.expect("get");
    assert_eq!(stored.resume_token.as_deref(), Some("sess-new"));
}

#[tokio::test]
async fn empty_turn_writes_nothing() {
    let db = memory_db().await;
    let conversation = seed_conversation(&db, "alice", Some("sess-old")).await;
    let store = SqliteConversationStore::new(Arc::clone(&db));

    let report = finalize_turn(&store, &conversation.id, &outcome(&[], None), "t").await;

    assert!(!report.message_saved);
    assert!(!report.token_saved);
    assert!(MessageRepo::new(Arc::clone(&db))
        .list_for_conversation(&conversation.id)
        .await
        .expect("list")
        .is_empty());
    let stored = ConversationRepo::new(db).get_by_id(&conversation.id).await.expect("get");
    assert_eq!(stored.resume_token.as_deref(), Some("sess-old"));
    assert_eq!(stored.updated_at, conversation.updated_at);
}

/// Store whose message writes always fail.
struct BrokenMessages {
    inner: SqliteConversationStore,
}

impl ConversationStore for BrokenMessages {
    fn get_conversation<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Conversation> {
        self.inner.get_conversation(id)
    }

    fn append_message<'a>(
        &'a self,
        _conversation_id: &'a str,
        _role: MessageRole,
        _text: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(AppError::Db("disk full".into())) })
    }

    fn update_conversation<'a>(
        &'a self,
        id: &'a str,
        update: ConversationUpdate,
    ) -> StoreFuture<'a, ()> {
        self.inner.update_conversation(id, update)
    }
}

#[tokio::test]
async fn failed_message_write_does_not_block_token_write() {
    let db = memory_db().await;
    let conversation = seed_conversation(&db, "alice", None).await;
    let store = BrokenMessages {
        inner: SqliteConversationStore::new(Arc::clone(&db)),
    };

    let report = finalize_turn(&store, &conversation.id, &outcome(&["4"], Some("sess-1")), "t").await;

    assert!(!report.message_saved);
    assert!(report.token_saved);
    let stored = ConversationRepo::new(db).get_by_id(&conversation.id).await.expect("get");
    assert_eq!(stored.resume_token.as_deref(), Some("sess-1"));
}

#[tokio::test]
async fn missing_conversation_is_logged_not_raised() {
    let db = memory_db().await;
    let store = SqliteConversationStore::new(db);

    let report = finalize_turn(&store, "deleted-mid-turn", &outcome(&["4"], Some("sess-1")), "t").await;

    assert!(!report.message_saved);
    assert!(!report.token_saved);
}
