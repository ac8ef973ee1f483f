//! Event stream publisher.
//!
//! Drains the bridge channel, translates each [`AgentEvent`] into a
//! [`StreamFrame`] for the HTTP client, accumulates the assistant
//! transcript, and enforces the idle timeout. Always finishes with exactly
//! one terminal frame, whatever ended the loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::bridge::BridgeItem;
use super::frame::StreamFrame;
use crate::agent::AgentEvent;

/// Why the publisher stopped reading the bridge channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnExit {
    /// The end-of-stream sentinel arrived.
    Completed,
    /// No item arrived within the idle timeout; the worker may still be running.
    IdleTimeout,
    /// The HTTP client went away or stopped reading.
    ClientDisconnected,
}

/// Ordered text fragments collected during one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    fragments: Vec<String>,
}

impl Transcript {
    /// Append a text fragment.
    pub fn push(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_owned());
    }

    /// Whether no text was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.iter().all(String::is_empty)
    }

    /// Number of fragments collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Concatenation of all fragments in arrival order.
    #[must_use]
    pub fn text(&self) -> String {
        self.fragments.concat()
    }
}

/// What a finished publisher hands to the finalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Assistant text accumulated from `TextDelta` events.
    pub transcript: Transcript,
    /// Resume token from the turn's `Done` event, if one arrived.
    pub resume_token: Option<String>,
    /// How the read loop ended.
    pub exit: TurnExit,
}

/// Publish one turn.
///
/// Reads `items` until [`BridgeItem::End`], channel closure, an idle gap
/// longer than `idle_timeout`, or a send on `frames` that fails or stays
/// blocked for `idle_timeout` (client gone or not reading). Then emits the
/// terminal frame (best effort, same bound) and returns the outcome.
pub async fn publish_turn(
    mut items: mpsc::Receiver<BridgeItem>,
    frames: mpsc::Sender<StreamFrame>,
    idle_timeout: Duration,
    turn_id: &str,
) -> TurnOutcome {
    let mut transcript = Transcript::default();
    let mut resume_token: Option<String> = None;

    let exit = loop {
        let item = match tokio::time::timeout(idle_timeout, items.recv()).await {
            Err(_elapsed) => {
                info!(turn_id, ?idle_timeout, "publisher: idle timeout, closing stream");
                break TurnExit::IdleTimeout;
            }
            Ok(None | Some(BridgeItem::End)) => break TurnExit::Completed,
            Ok(Some(BridgeItem::Event(event))) => event,
        };

        let Some(frame) = event_to_frame(item, &mut transcript, &mut resume_token) else {
            continue;
        };

        if !send_frame(&frames, frame, idle_timeout).await {
            debug!(turn_id, "publisher: client disconnected or stopped reading");
            break TurnExit::ClientDisconnected;
        }
    };

    // Stop accepting bridge items; the worker's later sends become no-ops.
    drop(items);

    let done = StreamFrame::done(resume_token.clone());
    if !send_frame(&frames, done, idle_timeout).await {
        debug!(turn_id, "publisher: terminal frame not delivered, client gone");
    }
    drop(frames);

    TurnOutcome {
        transcript,
        resume_token,
        exit,
    }
}

/// Deliver one frame, giving a connected but stalled reader at most
/// `limit` to make room. Returns `false` if the frame was not delivered.
async fn send_frame(
    frames: &mpsc::Sender<StreamFrame>,
    frame: StreamFrame,
    limit: Duration,
) -> bool {
    matches!(tokio::time::timeout(limit, frames.send(frame)).await, Ok(Ok(())))
}

/// Map one agent event to its frame, updating turn state.
///
/// Empty fragments and `Done` produce no frame.
fn event_to_frame(
    event: AgentEvent,
    transcript: &mut Transcript,
    resume_token: &mut Option<String>,
) -> Option<StreamFrame> {
    match event {
        AgentEvent::Thinking(text) if !text.is_empty() => Some(StreamFrame::thinking(text)),
        AgentEvent::TextDelta(text) if !text.is_empty() => {
            transcript.push(&text);
            Some(StreamFrame::text(text))
        }
        AgentEvent::Thinking(_) | AgentEvent::TextDelta(_) => None,
        AgentEvent::Done(token) => {
            *resume_token = token;
            None
        }
    }
}
