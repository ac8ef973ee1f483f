//! `POST /api/sessions/{id}/chat`: one streamed chat turn.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderName};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use serde::Deserialize;
use tracing::warn;

use super::{AppState, CurrentUser};
use crate::chat::prompt::{role_preamble, DocumentContext};
use crate::chat::{TurnInput, TurnStream};
use crate::persistence::profile_repo::ProfileRepo;
use crate::Result;

/// Already-extracted document attached to a question.
#[derive(Debug, Deserialize)]
pub struct DocumentPayload {
    /// Original file name.
    pub name: String,
    /// Extracted plain text.
    pub content: String,
}

/// Body of a chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Optional document context.
    #[serde(default)]
    pub document: Option<DocumentPayload>,
}

/// Start a turn and stream its frames as server-sent events.
///
/// # Errors
///
/// Rejections happen before any stream is opened: 404 for a session the
/// caller does not own, 400 for an empty message or blank document.
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Response> {
    let profile = match ProfileRepo::new(Arc::clone(&state.db)).get(&user.id).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(user_id = user.id, %err, "profile lookup failed, continuing without preamble");
            None
        }
    };

    let input = TurnInput {
        user_id: user.id,
        conversation_id: id,
        message: body.message,
        document: body.document.map(|doc| DocumentContext {
            name: doc.name,
            text: doc.content,
        }),
        role_preamble: role_preamble(profile.as_ref()).map(str::to_owned),
    };

    let TurnStream { frames, .. } = state.chat.begin_turn(input).await?;

    let events = stream::unfold(frames, |mut frames| async move {
        let frame = frames.recv().await?;
        Some((Ok::<Event, Infallible>(frame.into_event()), frames))
    });

    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    let response = match state.config.stream.keep_alive() {
        Some(interval) => (
            headers,
            Sse::new(events).keep_alive(KeepAlive::new().interval(interval)),
        )
            .into_response(),
        None => (headers, Sse::new(events)).into_response(),
    };

    Ok(response)
}
