//! Bridge executor.
//!
//! Runs one turn's [`AgentProvider`] on a dedicated OS thread with its own
//! current-thread tokio runtime, relaying every [`AgentEvent`] into a
//! bounded channel read by the publisher. The producer and the HTTP
//! request never share a runtime or a cancellation scope: when the request
//! goes away the worker keeps running to the producer's natural end, and
//! its remaining sends become no-ops.
//!
//! Exactly one [`BridgeItem::End`] is enqueued per turn. It is sent by a
//! drop guard owned by the worker thread, so producer errors, a failed
//! runtime build, and panics all still end the stream.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::{AgentEvent, AgentProvider, TurnRequest};
use crate::{AppError, Result};

/// Item carried by the bridge channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeItem {
    /// An event produced by the agent.
    Event(AgentEvent),
    /// End of stream; no further items follow.
    End,
}

/// Handle on a running bridge worker.
///
/// Dropping the handle detaches the worker; it is never joined on the
/// request path.
#[derive(Debug)]
pub struct BridgeHandle {
    turn_id: String,
    thread: JoinHandle<()>,
}

impl BridgeHandle {
    /// Identifier of the turn this worker serves.
    #[must_use]
    pub fn turn_id(&self) -> &str {
        &self.turn_id
    }

    /// Block until the worker exits. Intended for tests and tooling only.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent` if the worker panicked.
    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| AppError::Agent("bridge worker panicked".into()))
    }
}

/// Enqueues [`BridgeItem::End`] when dropped.
struct SentinelGuard {
    turn_id: String,
    tx: mpsc::Sender<BridgeItem>,
}

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        // Runs on the worker thread outside any runtime context, where
        // blocking_send is permitted. A closed channel makes this a no-op.
        if self.tx.blocking_send(BridgeItem::End).is_err() {
            debug!(turn_id = self.turn_id, "bridge: reader gone before end of stream");
        }
    }
}

/// Start the producer for `request` on a fresh worker thread.
///
/// Returns the receiving half of a channel of `capacity` items plus a
/// handle on the worker.
///
/// # Errors
///
/// Returns `AppError::Agent` if the OS refuses to spawn the thread. No
/// channel item is ever produced in that case.
pub fn spawn_bridge(
    provider: Arc<dyn AgentProvider>,
    request: TurnRequest,
    turn_id: String,
    capacity: usize,
) -> Result<(mpsc::Receiver<BridgeItem>, BridgeHandle)> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let worker_turn_id = turn_id.clone();

    let thread = thread::Builder::new()
        .name(format!("turn-{}", short_id(&turn_id)))
        .spawn(move || run_worker(provider, request, worker_turn_id, tx))
        .map_err(|err| AppError::Agent(format!("failed to spawn bridge worker: {err}")))?;

    Ok((rx, BridgeHandle { turn_id, thread }))
}

fn run_worker(
    provider: Arc<dyn AgentProvider>,
    request: TurnRequest,
    turn_id: String,
    tx: mpsc::Sender<BridgeItem>,
) {
    let guard = SentinelGuard {
        turn_id: turn_id.clone(),
        tx: tx.clone(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            warn!(turn_id, %err, "bridge: failed to build worker runtime");
            return;
        }
    };

    runtime.block_on(relay(provider.as_ref(), request, &turn_id, &tx));

    // Drop the runtime (and any helper tasks the producer spawned) before
    // the guard enqueues the sentinel from outside the runtime context.
    drop(runtime);
    drop(guard);
}

/// Drive the producer to completion, forwarding events in order.
///
/// After the reader goes away events are discarded but the producer is
/// still drained, so the upstream agent reaches its own end.
async fn relay(
    provider: &dyn AgentProvider,
    request: TurnRequest,
    turn_id: &str,
    tx: &mpsc::Sender<BridgeItem>,
) {
    let mut events = match provider.open_turn(request).await {
        Ok(events) => events,
        Err(err) => {
            warn!(turn_id, %err, "bridge: agent turn failed to start");
            return;
        }
    };

    let mut reader_alive = true;
    let mut relayed = 0usize;

    while let Some(item) = events.next().await {
        match item {
            Ok(event) => {
                if reader_alive {
                    if tx.send(BridgeItem::Event(event)).await.is_err() {
                        debug!(turn_id, "bridge: reader gone, draining producer");
                        reader_alive = false;
                    } else {
                        relayed += 1;
                    }
                }
            }
            Err(err) => {
                warn!(turn_id, %err, "bridge: producer failed mid-stream");
                break;
            }
        }
    }

    info!(turn_id, relayed, reader_alive, "bridge: producer finished");
}

fn short_id(turn_id: &str) -> &str {
    turn_id.get(..8).unwrap_or(turn_id)
}
