//! Process-backed [`AgentProvider`].
//!
//! Each turn spawns the configured agent CLI, decodes its stdout with
//! [`TurnDecoder`], and yields the resulting [`AgentEvent`]s in order.
//!
//! Termination rules:
//! - A `result` line yields `Done` and ends the visible sequence; remaining
//!   output is drained so the agent can finish persisting its session.
//! - Clean exit without a `result` line yields `Done` with the token
//!   captured from `init` (possibly `None`).
//! - Non-zero exit without a `result` line, or a read error on stdout,
//!   yields a single `Err` and ends the sequence.
//! - Over-long and non-UTF-8 lines are skipped by [`NdjsonCodec`] and never
//!   end the turn.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use futures_util::{stream, StreamExt};
use tokio::process::{Child, ChildStdout};
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};
use uuid::Uuid;

use super::codec::NdjsonCodec;
use super::decoder::TurnDecoder;
use super::spawner::spawn_agent;
use super::{AgentEvent, AgentEventStream, AgentProvider, TurnRequest};
use crate::config::AgentConfig;
use crate::{AppError, Result};

/// Agent provider that runs the agent CLI once per turn.
#[derive(Debug, Clone)]
pub struct CliAgentProvider {
    config: AgentConfig,
}

impl CliAgentProvider {
    /// Create a provider for the given CLI settings.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }
}

impl AgentProvider for CliAgentProvider {
    fn open_turn(
        &self,
        request: TurnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AgentEventStream>> + Send + '_>> {
        Box::pin(async move {
            let turn_id = Uuid::new_v4().to_string();
            let process = spawn_agent(&self.config, &request, &turn_id).await?;
            let state = CliTurn::new(turn_id, process.child, process.stdout);
            let events: AgentEventStream = Box::pin(stream::unfold(state, CliTurn::advance));
            Ok(events)
        })
    }
}

/// Decoding state for one running CLI turn.
struct CliTurn {
    turn_id: String,
    lines: FramedRead<ChildStdout, NdjsonCodec>,
    decoder: TurnDecoder,
    pending: VecDeque<AgentEvent>,
    child: Child,
    finished: bool,
}

impl CliTurn {
    fn new(turn_id: String, child: Child, stdout: ChildStdout) -> Self {
        Self {
            turn_id,
            lines: FramedRead::new(stdout, NdjsonCodec::new()),
            decoder: TurnDecoder::new(),
            pending: VecDeque::new(),
            child,
            finished: false,
        }
    }

    async fn advance(mut self) -> Option<(Result<AgentEvent>, Self)> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some((Ok(event), self));
            }
            if self.finished {
                return None;
            }

            match self.lines.next().await {
                Some(Ok(line)) => {
                    if self.decoder.is_completed() {
                        continue;
                    }
                    match self.decoder.decode_line(&line) {
                        Ok(events) => self.pending.extend(events),
                        Err(err) => {
                            warn!(turn_id = self.turn_id, %err, "agent: skipping undecodable line");
                        }
                    }
                }
                Some(Err(err)) => {
                    warn!(turn_id = self.turn_id, %err, "agent: stdout read failed");
                    self.finished = true;
                    return Some((Err(err), self));
                }
                None => {
                    self.finished = true;
                    let outcome = self.on_eof().await;
                    return outcome.map(|item| (item, self));
                }
            }
        }
    }

    async fn on_eof(&mut self) -> Option<Result<AgentEvent>> {
        let status = self.child.wait().await;
        debug!(turn_id = self.turn_id, ?status, "agent process exited");

        if self.decoder.is_completed() {
            return None;
        }

        match status {
            Ok(status) if status.success() => Some(Ok(AgentEvent::Done(
                self.decoder.resume_token().map(str::to_owned),
            ))),
            Ok(status) => Some(Err(AppError::Agent(format!(
                "agent exited before completing the turn: {status}"
            )))),
            Err(err) => Some(Err(AppError::Agent(format!(
                "failed to wait for agent: {err}"
            )))),
        }
    }
}
