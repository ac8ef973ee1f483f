//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which runtime credentials are stored.
pub const KEYRING_SERVICE: &str = "edu-assistant";

/// Agent CLI invocation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Agent CLI binary that emits NDJSON stream events (e.g. `claude`).
    #[serde(default = "default_agent_cli")]
    pub cli: String,
    /// Extra arguments appended after the built-in streaming flags.
    #[serde(default)]
    pub args: Vec<String>,
    /// Tools the agent may invoke during a turn.
    #[serde(default = "default_allowed_tools")]
    pub allowed_tools: Vec<String>,
    /// Working directory for the agent process; inherits the server's when unset.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            cli: default_agent_cli(),
            args: Vec::new(),
            allowed_tools: default_allowed_tools(),
            workdir: None,
        }
    }
}

fn default_agent_cli() -> String {
    "claude".into()
}

fn default_allowed_tools() -> Vec<String> {
    vec!["WebSearch".into()]
}

/// Streaming chat tunables.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Maximum gap between two bridge items before the stream is closed.
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
    /// Capacity of the bounded channel between producer and publisher.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// SSE keep-alive comment interval; 0 disables keep-alive.
    #[serde(default = "default_keep_alive_seconds")]
    pub keep_alive_seconds: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_idle_timeout_seconds(),
            channel_capacity: default_channel_capacity(),
            keep_alive_seconds: default_keep_alive_seconds(),
        }
    }
}

impl StreamConfig {
    /// Idle timeout as a [`Duration`].
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Keep-alive interval, or `None` when disabled.
    #[must_use]
    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_seconds > 0).then(|| Duration::from_secs(self.keep_alive_seconds))
    }
}

fn default_idle_timeout_seconds() -> u64 {
    600
}

fn default_channel_capacity() -> usize {
    256
}

fn default_keep_alive_seconds() -> u64 {
    15
}

/// Hosted identity provider settings.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variable, never from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IdentityConfig {
    /// Base URL of the identity provider.
    pub url: String,
    /// Project API key sent alongside bearer verification (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8000
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("edu-assistant.db")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// HTTP port for the API and event streams.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Agent CLI settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Streaming chat tunables.
    #[serde(default)]
    pub stream: StreamConfig,
    /// Identity provider settings.
    pub identity: IdentityConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the identity provider API key from OS keychain with env-var fallback.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env var provides it.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.identity.api_key = load_credential("identity_api_key", "IDENTITY_API_KEY").await?;
        Ok(())
    }

    /// Socket address string the HTTP server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    fn validate(&self) -> Result<()> {
        if self.agent.cli.trim().is_empty() {
            return Err(AppError::Config("agent.cli must not be empty".into()));
        }

        if self.stream.idle_timeout_seconds == 0 {
            return Err(AppError::Config(
                "stream.idle_timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.stream.channel_capacity == 0 {
            return Err(AppError::Config(
                "stream.channel_capacity must be greater than zero".into(),
            ));
        }

        if self.identity.url.trim().is_empty() {
            return Err(AppError::Config("identity.url must not be empty".into()));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
