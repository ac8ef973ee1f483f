//! Streaming chat bridge.
//!
//! One turn flows through four stages:
//!
//! 1. [`begin_turn`] reads the conversation, stores the user message and
//!    launches the producer through [`bridge::spawn_bridge`].
//! 2. The bridge worker relays [`AgentEvent`](crate::agent::AgentEvent)s
//!    into a bounded channel from its own thread and runtime.
//! 3. [`publisher::publish_turn`] drains that channel into
//!    [`frame::StreamFrame`]s for the HTTP body.
//! 4. [`finalizer::finalize_turn`] persists the transcript and resume token.
//!
//! Stages 3 and 4 run on one spawned task that is independent of the HTTP
//! response body, so finalization still happens after a client disconnect.

pub mod bridge;
pub mod finalizer;
pub mod frame;
pub mod prompt;
pub mod publisher;
pub mod store;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::agent::{AgentProvider, TurnRequest};
use crate::config::StreamConfig;
use crate::models::message::MessageRole;
use crate::{AppError, Result};

use self::bridge::{spawn_bridge, BridgeHandle};
use self::finalizer::{finalize_turn, FinalizeReport};
use self::frame::StreamFrame;
use self::prompt::{compose_preamble, compose_prompt, stored_user_text, DocumentContext};
use self::publisher::{publish_turn, TurnOutcome};
use self::store::ConversationStore;

/// Collaborators shared by every turn.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    agent: Arc<dyn AgentProvider>,
    stream: StreamConfig,
}

/// Caller-supplied input for one turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Authenticated caller; must own the conversation.
    pub user_id: String,
    /// Conversation to continue.
    pub conversation_id: String,
    /// The user's message.
    pub message: String,
    /// Extracted document the question refers to.
    pub document: Option<DocumentContext>,
    /// Role preamble derived from the caller's profile.
    pub role_preamble: Option<String>,
}

/// A started turn.
#[derive(Debug)]
pub struct TurnStream {
    /// Identifier used in logs for this turn.
    pub turn_id: String,
    /// Frames for the client, ending with exactly one `done` frame.
    pub frames: mpsc::Receiver<StreamFrame>,
    /// Publisher and finalizer task; resolves once the turn is persisted.
    pub finished: JoinHandle<(TurnOutcome, FinalizeReport)>,
    /// Producer worker; dropping it detaches the thread.
    pub worker: BridgeHandle,
}

impl ChatService {
    /// Create a chat service over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        agent: Arc<dyn AgentProvider>,
        stream: StreamConfig,
    ) -> Self {
        Self {
            store,
            agent,
            stream,
        }
    }

    /// Start one turn and return its frame stream.
    ///
    /// Validation, the ownership check and the user-message write happen
    /// before any worker is launched; a failure there creates no channel.
    ///
    /// # Errors
    ///
    /// - `AppError::BadRequest` for an empty message or a blank document.
    /// - `AppError::NotFound` if the conversation is unknown or not owned
    ///   by `input.user_id`.
    /// - `AppError::Db` if the user message cannot be stored.
    /// - `AppError::Agent` if the worker thread cannot be spawned.
    pub async fn begin_turn(&self, input: TurnInput) -> Result<TurnStream> {
        if input.message.trim().is_empty() {
            return Err(AppError::BadRequest("message must not be empty".into()));
        }
        if input
            .document
            .as_ref()
            .is_some_and(|doc| doc.text.trim().is_empty())
        {
            return Err(AppError::BadRequest(
                "document has no extractable text".into(),
            ));
        }

        let conversation = self.store.get_conversation(&input.conversation_id).await?;
        if !conversation.is_owned_by(&input.user_id) {
            return Err(AppError::NotFound("session not found".into()));
        }

        let has_document = input.document.is_some();
        self.store
            .append_message(
                &conversation.id,
                MessageRole::User,
                &stored_user_text(&input.message, has_document),
            )
            .await?;

        let request = TurnRequest::new(compose_prompt(&input.message, input.document.as_ref()))
            .with_resume_token(conversation.resume_token.clone())
            .with_preamble(compose_preamble(input.role_preamble.as_deref(), has_document));

        let turn_id = Uuid::new_v4().to_string();
        let capacity = self.stream.channel_capacity;
        let (items, worker) = spawn_bridge(
            Arc::clone(&self.agent),
            request,
            turn_id.clone(),
            capacity,
        )?;

        info!(
            turn_id,
            conversation_id = conversation.id,
            user_id = input.user_id,
            resumed = conversation.resume_token.is_some(),
            has_document,
            "turn started"
        );

        let (frame_tx, frame_rx) = mpsc::channel(capacity.max(1));
        let store = Arc::clone(&self.store);
        let idle_timeout = self.stream.idle_timeout();
        let task_turn_id = turn_id.clone();
        let conversation_id = conversation.id;

        let finished = tokio::spawn(async move {
            let outcome = publish_turn(items, frame_tx, idle_timeout, &task_turn_id).await;
            let report =
                finalize_turn(store.as_ref(), &conversation_id, &outcome, &task_turn_id).await;
            (outcome, report)
        });

        Ok(TurnStream {
            turn_id,
            frames: frame_rx,
            finished,
            worker,
        })
    }
}
