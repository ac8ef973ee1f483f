//! Upstream stream-event decoder.
//!
//! Turns the agent CLI's newline-delimited JSON output into [`AgentEvent`]s.
//!
//! # Known upstream line types
//!
//! | `type`         | Handling                                                   |
//! |----------------|------------------------------------------------------------|
//! | `system`       | `subtype = "init"` captures `session_id` as resume token   |
//! | `stream_event` | tool-span bracketing and `text_delta` → `TextDelta`        |
//! | `assistant`    | `thinking` content blocks → `Thinking`                     |
//! | `result`       | completion → `Done`; its `session_id` wins over init's     |
//! | *(any other)*  | Skipped; logged at `DEBUG`                                 |
//!
//! Text deltas inside a tool span (between a `content_block_start` whose
//! block is `tool_use` and the next `content_block_stop`) are suppressed.
//! Thinking is surfaced regardless of tool-span state.

use serde::Deserialize;
use tracing::debug;

use super::AgentEvent;
use crate::{AppError, Result};

/// Top-level upstream line envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UpstreamLine {
    System {
        subtype: Option<String>,
        session_id: Option<String>,
    },
    StreamEvent {
        event: StreamPayload,
    },
    Assistant {
        message: AssistantMessage,
    },
    Result {
        session_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Raw model streaming event wrapped by a `stream_event` line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    ContentBlockStart {
        content_block: Option<ContentBlock>,
    },
    ContentBlockDelta {
        delta: Delta,
    },
    ContentBlockStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<AssistantBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AssistantBlock {
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// Per-turn decoding state.
#[derive(Debug, Default)]
pub struct TurnDecoder {
    resume_token: Option<String>,
    in_tool: bool,
    completed: bool,
}

impl TurnDecoder {
    /// Create a decoder for a fresh turn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume token captured so far (from init, or from completion).
    #[must_use]
    pub fn resume_token(&self) -> Option<&str> {
        self.resume_token.as_deref()
    }

    /// Whether a completion (`result`) line has been decoded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Decode one NDJSON line.
    ///
    /// A single line yields at most a handful of events (an `assistant`
    /// message may carry several thinking blocks). Blank lines and unknown
    /// line types yield nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Agent("malformed json: …")` if the line is not a
    /// valid upstream message.
    pub fn decode_line(&mut self, line: &str) -> Result<Vec<AgentEvent>> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: UpstreamLine = serde_json::from_str(line)
            .map_err(|e| AppError::Agent(format!("malformed json: {e}")))?;

        let events = match parsed {
            UpstreamLine::System {
                subtype,
                session_id,
            } => {
                if subtype.as_deref() == Some("init") {
                    if let Some(token) = session_id {
                        self.resume_token = Some(token);
                    }
                }
                Vec::new()
            }
            UpstreamLine::StreamEvent { event } => self.decode_stream_payload(event),
            UpstreamLine::Assistant { message } => message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    AssistantBlock::Thinking { thinking } => Some(AgentEvent::Thinking(thinking)),
                    AssistantBlock::Other => None,
                })
                .collect(),
            UpstreamLine::Result { session_id } => {
                if session_id.is_some() {
                    self.resume_token = session_id;
                }
                self.completed = true;
                vec![AgentEvent::Done(self.resume_token.clone())]
            }
            UpstreamLine::Other => {
                debug!("agent decoder: skipping unhandled line type");
                Vec::new()
            }
        };

        Ok(events)
    }

    fn decode_stream_payload(&mut self, payload: StreamPayload) -> Vec<AgentEvent> {
        match payload {
            StreamPayload::ContentBlockStart { content_block } => {
                if content_block.is_some_and(|b| b.block_type == "tool_use") {
                    self.in_tool = true;
                }
                Vec::new()
            }
            StreamPayload::ContentBlockDelta { delta } => {
                if delta.delta_type == "text_delta" && !self.in_tool {
                    delta
                        .text
                        .map(AgentEvent::TextDelta)
                        .into_iter()
                        .collect()
                } else {
                    Vec::new()
                }
            }
            StreamPayload::ContentBlockStop => {
                self.in_tool = false;
                Vec::new()
            }
            StreamPayload::Other => Vec::new(),
        }
    }
}
