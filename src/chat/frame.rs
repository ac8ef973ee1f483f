//! Wire frames of the chat event stream.
//!
//! | SSE event | data                                         |
//! |-----------|----------------------------------------------|
//! | `message` | `{"type":"thinking"\|"text","content":"…"}`  |
//! | `done`    | `{"session_id":"…"}` or `{"session_id":null}` |

use axum::response::sse::Event;
use serde::Serialize;

/// SSE event name for content frames.
pub const MESSAGE_EVENT: &str = "message";
/// SSE event name for the terminal frame.
pub const DONE_EVENT: &str = "done";

/// Kind of content carried by a message frame.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Model reasoning.
    Thinking,
    /// Assistant answer text.
    Text,
}

/// Payload of a `message` frame.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContentData {
    /// Content kind, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Text fragment.
    pub content: String,
}

/// Payload of the terminal `done` frame.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DoneData {
    /// Resume token for the next turn, if the agent produced one.
    pub session_id: Option<String>,
}

/// One frame pushed to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A thinking or text fragment.
    Content(ContentData),
    /// End of the turn. Emitted exactly once, always last.
    Done(DoneData),
}

impl StreamFrame {
    /// Thinking frame.
    #[must_use]
    pub fn thinking(content: impl Into<String>) -> Self {
        Self::Content(ContentData {
            kind: ContentKind::Thinking,
            content: content.into(),
        })
    }

    /// Text frame.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Content(ContentData {
            kind: ContentKind::Text,
            content: content.into(),
        })
    }

    /// Terminal frame.
    #[must_use]
    pub fn done(session_id: Option<String>) -> Self {
        Self::Done(DoneData { session_id })
    }

    /// Whether this is the terminal frame.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// SSE event name.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Content(_) => MESSAGE_EVENT,
            Self::Done(_) => DONE_EVENT,
        }
    }

    /// JSON `data` line of the frame.
    #[must_use]
    pub fn data_json(&self) -> String {
        let encoded = match self {
            Self::Content(data) => serde_json::to_string(data),
            Self::Done(data) => serde_json::to_string(data),
        };
        encoded.unwrap_or_else(|_| "{}".to_owned())
    }

    /// Convert into an axum SSE event.
    #[must_use]
    pub fn into_event(self) -> Event {
        Event::default()
            .event(self.event_name())
            .data(self.data_json())
    }
}
