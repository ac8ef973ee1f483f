//! Bearer-token authentication against the hosted identity provider.
//!
//! Verification fails closed: any transport error, non-success status or
//! unexpected body yields `AppError::Unauthorized`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::{AppError, Result};

const INVALID_TOKEN: &str = "Invalid or expired token";
const MISSING_HEADER: &str = "Missing or invalid authorization header";

/// A caller whose bearer credential was verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Stable user identifier issued by the identity provider.
    pub id: String,
    /// Email address, when the provider shares one.
    #[serde(default)]
    pub email: Option<String>,
}

/// Identity provider seam.
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` when the token cannot be verified.
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser>> + Send + 'a>>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the header is absent, uses another
/// scheme, or carries an empty token.
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let value = header.ok_or_else(|| AppError::Unauthorized(MISSING_HEADER.into()))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized(MISSING_HEADER.into()))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(MISSING_HEADER.into()));
    }
    Ok(token)
}

/// Identity provider backed by the hosted auth service's `/auth/v1/user`.
#[derive(Debug, Clone)]
pub struct HostedIdentityProvider {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
}

impl HostedIdentityProvider {
    /// Build a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| AppError::Config(format!("failed to build identity client: {err}")))?;
        Ok(Self {
            client,
            user_url: format!("{}/auth/v1/user", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_user(&self, token: &str) -> Result<AuthenticatedUser> {
        let response = self
            .client
            .get(&self.user_url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|err| {
                warn!(%err, "identity provider unreachable");
                AppError::Unauthorized(INVALID_TOKEN.into())
            })?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "identity provider rejected token");
            return Err(AppError::Unauthorized(INVALID_TOKEN.into()));
        }

        let user: AuthenticatedUser = response.json().await.map_err(|err| {
            warn!(%err, "identity provider returned an unexpected body");
            AppError::Unauthorized(INVALID_TOKEN.into())
        })?;

        if user.id.is_empty() {
            return Err(AppError::Unauthorized(INVALID_TOKEN.into()));
        }
        Ok(user)
    }
}

impl IdentityProvider for HostedIdentityProvider {
    fn verify<'a>(
        &'a self,
        token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AuthenticatedUser>> + Send + 'a>> {
        Box::pin(self.fetch_user(token))
    }
}
