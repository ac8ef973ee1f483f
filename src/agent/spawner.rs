//! Agent CLI process spawner.
//!
//! Spawns one headless agent process per turn with:
//! - `kill_on_drop(true)` so an abandoned process dies with its handle.
//! - `env_clear()` + an allowlist so identity-provider keys and other server
//!   secrets never reach the agent's environment.
//! - The prompt written to stdin (then closed) instead of passed as an
//!   argument, so long document prompts are not bounded by `ARG_MAX`.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use super::TurnRequest;
use crate::config::AgentConfig;
use crate::{AppError, Result};

/// Environment variables inherited by the spawned agent process.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "RUST_LOG",
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_BASE_URL",
    "CLAUDE_CONFIG_DIR",
    "HTTPS_PROXY",
    "HTTP_PROXY",
    "NO_PROXY",
    // Windows-specific variables.
    "USERPROFILE",
    "SystemRoot",
    "TEMP",
    "TMP",
    "APPDATA",
    "LOCALAPPDATA",
];

/// Running agent process for one turn.
#[derive(Debug)]
pub struct AgentProcess {
    /// Child handle; kept alive so `kill_on_drop` applies.
    pub child: Child,
    /// Agent stdout carrying NDJSON stream events.
    pub stdout: ChildStdout,
}

/// Build the argument vector for one turn.
///
/// Streaming flags come first, then resume / preamble / tool options, then
/// the operator-configured extra arguments.
#[must_use]
pub fn build_args(config: &AgentConfig, request: &TurnRequest) -> Vec<String> {
    let mut args: Vec<String> = [
        "-p",
        "--output-format",
        "stream-json",
        "--verbose",
        "--include-partial-messages",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect();

    if let Some(token) = request.resume_token.as_deref().filter(|t| !t.is_empty()) {
        args.push("--resume".into());
        args.push(token.to_owned());
    }

    if let Some(preamble) = request.preamble.as_deref().filter(|p| !p.is_empty()) {
        args.push("--append-system-prompt".into());
        args.push(preamble.to_owned());
    }

    if !config.allowed_tools.is_empty() {
        args.push("--allowedTools".into());
        args.extend(config.allowed_tools.iter().cloned());
    }

    args.extend(config.args.iter().cloned());
    args
}

/// Spawn the agent CLI for `request` and hand it the prompt.
///
/// Must be called from within a tokio runtime; stderr is drained by a task
/// spawned on the current runtime and logged at `DEBUG`.
///
/// # Errors
///
/// - `AppError::Agent("failed to spawn agent: …")`: OS spawn failure.
/// - `AppError::Agent("failed to write prompt: …")`: agent closed stdin early.
pub async fn spawn_agent(
    config: &AgentConfig,
    request: &TurnRequest,
    turn_id: &str,
) -> Result<AgentProcess> {
    let mut cmd = Command::new(&config.cli);
    cmd.args(build_args(config, request));

    cmd.env_clear();
    for &key in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(key) {
            cmd.env(key, val);
        }
    }

    if let Some(ref dir) = config.workdir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Agent(format!("failed to spawn agent: {err}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Agent("failed to capture agent stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Agent("failed to capture agent stdout".into()))?;

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(drain_stderr(turn_id.to_owned(), stderr));
    }

    stdin
        .write_all(request.prompt.as_bytes())
        .await
        .map_err(|err| AppError::Agent(format!("failed to write prompt: {err}")))?;
    stdin
        .shutdown()
        .await
        .map_err(|err| AppError::Agent(format!("failed to close agent stdin: {err}")))?;
    drop(stdin);

    debug!(turn_id, pid = child.id(), "agent process spawned");

    Ok(AgentProcess { child, stdout })
}

async fn drain_stderr(turn_id: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(turn_id, line = %line, "agent stderr");
    }
}
