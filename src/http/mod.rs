//! HTTP surface: axum router, shared state and the authenticated-user
//! extractor.

pub mod chat;
pub mod error;
pub mod profile;
pub mod sessions;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::auth::{bearer_token, AuthenticatedUser, IdentityProvider};
use crate::chat::ChatService;
use crate::config::GlobalConfig;
use crate::persistence::db::Database;
use crate::{AppError, Result};

/// Shared state handed to every handler.
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` pool for the repositories.
    pub db: Arc<Database>,
    /// Bearer-token verifier.
    pub identity: Arc<dyn IdentityProvider>,
    /// Turn launcher for the chat stream endpoint.
    pub chat: ChatService,
}

/// Extractor yielding the verified caller; rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;
        let user = state.identity.verify(token).await?;
        Ok(Self(user))
    }
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/me", get(profile::me))
        .route(
            "/api/auth/profile",
            get(profile::get_profile).put(profile::put_profile),
        )
        .route(
            "/api/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/api/sessions/{id}", delete(sessions::delete_session))
        .route("/api/sessions/{id}/messages", get(sessions::list_messages))
        .route("/api/sessions/{id}/chat", post(chat::chat_stream))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve the HTTP API on the configured address until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the address cannot be bound.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = state.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(bind, "starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Config(format!("HTTP server error: {err}")))?;

    info!("HTTP server shut down");
    Ok(())
}
