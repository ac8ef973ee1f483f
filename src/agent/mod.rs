//! Agent session client.
//!
//! Opens one logical turn against the hosted conversational agent and
//! exposes it as a lazy, finite, ordered sequence of [`AgentEvent`]s.
//!
//! - `codec`: NDJSON line framing with a per-line size cap.
//! - `decoder`: upstream stream-event lines → [`AgentEvent`] (tool-span
//!   suppression, resume-token capture).
//! - `spawner`: agent CLI process launch with environment isolation.
//! - `provider`: [`CliAgentProvider`](provider::CliAgentProvider), the
//!   process-backed [`AgentProvider`].

pub mod codec;
pub mod decoder;
pub mod provider;
pub mod spawner;

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use crate::Result;

/// One event produced by the agent during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Model reasoning surfaced to the user.
    Thinking(String),
    /// A fragment of the assistant's answer.
    TextDelta(String),
    /// The turn completed; carries the token that resumes this conversation.
    Done(Option<String>),
}

/// Input for a single agent turn. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    /// Full prompt text sent to the agent.
    pub prompt: String,
    /// Provider-assigned token from a previous turn, round-tripped verbatim.
    pub resume_token: Option<String>,
    /// Instruction preamble appended to the agent's system prompt.
    pub preamble: Option<String>,
}

impl TurnRequest {
    /// Build a request for a fresh conversation with no preamble.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            resume_token: None,
            preamble: None,
        }
    }

    /// Resume a prior conversation.
    #[must_use]
    pub fn with_resume_token(mut self, token: Option<String>) -> Self {
        self.resume_token = token;
        self
    }

    /// Attach an instruction preamble.
    #[must_use]
    pub fn with_preamble(mut self, preamble: Option<String>) -> Self {
        self.preamble = preamble;
        self
    }
}

/// Ordered, non-restartable stream of agent events for one turn.
///
/// An `Err` item means the producer failed; consumers stop reading after it.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// Hosted conversational agent seam.
///
/// `open_turn` is always invoked on the turn's dedicated worker runtime,
/// never on the HTTP runtime, so implementations may spawn tasks that must
/// not outlive that runtime.
pub trait AgentProvider: Send + Sync {
    /// Open one turn and return its event stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Agent`](crate::AppError::Agent) if the turn cannot be started.
    fn open_turn(
        &self,
        request: TurnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AgentEventStream>> + Send + '_>>;
}
