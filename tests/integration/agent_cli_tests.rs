//! `CliAgentProvider` against stand-in agent executables.
//!
//! Each test writes a small shell script that ignores its arguments,
//! swallows the prompt on stdin and prints canned NDJSON.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edu_assistant::agent::provider::CliAgentProvider;
use edu_assistant::agent::{AgentEvent, AgentProvider, TurnRequest};
use edu_assistant::config::AgentConfig;
use edu_assistant::AppError;
use futures_util::StreamExt;

fn fake_agent(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fake-agent");
    {
        let mut file = std::fs::File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\ncat > /dev/null\n{body}").expect("write script");
        file.sync_all().expect("sync script");
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

fn provider(cli: &Path) -> CliAgentProvider {
    CliAgentProvider::new(AgentConfig {
        cli: cli.to_string_lossy().into_owned(),
        ..AgentConfig::default()
    })
}

async fn run(provider: &CliAgentProvider) -> Vec<Result<AgentEvent, AppError>> {
    let stream = provider
        .open_turn(TurnRequest::new("2+2?"))
        .await
        .expect("agent spawns");
    stream.collect().await
}

#[tokio::test]
#[serial_test::serial]
async fn decodes_a_complete_turn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        r#"cat <<'EOF'
{"type":"system","subtype":"init","session_id":"s-init"}
{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"adding"}]}}
{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"4"}}}
{"type":"result","subtype":"success","session_id":"s-final"}
EOF"#,
    );

    let events: Vec<AgentEvent> = run(&provider(&script))
        .await
        .into_iter()
        .map(|r| r.expect("no errors"))
        .collect();

    assert_eq!(
        events,
        vec![
            AgentEvent::Thinking("adding".into()),
            AgentEvent::TextDelta("4".into()),
            AgentEvent::Done(Some("s-final".into())),
        ]
    );
}

#[tokio::test]
#[serial_test::serial]
async fn clean_exit_without_result_synthesizes_done() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"system","subtype":"init","session_id":"s-init"}'
echo 'not json at all'
echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"ok"}}}'"#,
    );

    let events: Vec<AgentEvent> = run(&provider(&script))
        .await
        .into_iter()
        .map(|r| r.expect("no errors"))
        .collect();

    assert_eq!(
        events,
        vec![
            AgentEvent::TextDelta("ok".into()),
            AgentEvent::Done(Some("s-init".into())),
        ]
    );
}

#[tokio::test]
#[serial_test::serial]
async fn failed_exit_without_result_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"Par"}}}'
exit 3"#,
    );

    let items = run(&provider(&script)).await;

    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], Ok(AgentEvent::TextDelta(ref t)) if t == "Par"));
    assert!(matches!(items[1], Err(AppError::Agent(ref m)) if m.contains("before completing")));
}

#[tokio::test]
#[serial_test::serial]
async fn lines_after_result_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        r#"echo '{"type":"result","session_id":"s-1"}'
echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"late"}}}'"#,
    );

    let events: Vec<AgentEvent> = run(&provider(&script))
        .await
        .into_iter()
        .map(|r| r.expect("no errors"))
        .collect();

    assert_eq!(events, vec![AgentEvent::Done(Some("s-1".into()))]);
}

/// Shell snippet printing one line of `bytes` filler characters.
fn oversized_line(bytes: usize) -> String {
    format!("head -c {bytes} /dev/zero | tr '\\0' 'x'; echo")
}

#[tokio::test]
#[serial_test::serial]
async fn oversized_line_is_skipped_and_turn_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        &format!(
            r#"echo '{{"type":"system","subtype":"init","session_id":"s-init"}}'
{}
echo '{{"type":"stream_event","event":{{"type":"content_block_delta","delta":{{"type":"text_delta","text":"after"}}}}}}'
echo '{{"type":"result","subtype":"success","session_id":"s-final"}}'"#,
            oversized_line(1_100_000)
        ),
    );

    let events: Vec<AgentEvent> = tokio::time::timeout(Duration::from_secs(10), run(&provider(&script)))
        .await
        .expect("turn ends")
        .into_iter()
        .map(|r| r.expect("no errors"))
        .collect();

    assert_eq!(
        events,
        vec![
            AgentEvent::TextDelta("after".into()),
            AgentEvent::Done(Some("s-final".into())),
        ]
    );
}

#[tokio::test]
#[serial_test::serial]
async fn output_after_oversized_line_is_fully_drained() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        &format!(
            r#"{}
i=0
while [ $i -lt 2000 ]; do
  echo '{{"type":"stream_event","event":{{"type":"content_block_delta","delta":{{"type":"text_delta","text":"."}}}}}}'
  i=$((i+1))
done
echo '{{"type":"result","session_id":"s-long"}}'"#,
            oversized_line(1_100_000)
        ),
    );

    let items = tokio::time::timeout(Duration::from_secs(10), run(&provider(&script)))
        .await
        .expect("turn ends instead of stalling on a full pipe");

    let deltas = items
        .iter()
        .filter(|r| matches!(r, Ok(AgentEvent::TextDelta(_))))
        .count();
    assert_eq!(deltas, 2000);
    assert!(matches!(items.last(), Some(Ok(AgentEvent::Done(Some(ref t)))) if t == "s-long"));
}

#[tokio::test]
#[serial_test::serial]
async fn non_utf8_line_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = fake_agent(
        &dir,
        r#"printf '\377\376\n'
echo '{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"text_delta","text":"ok"}}}'
echo '{"type":"result","session_id":"s-1"}'"#,
    );

    let events: Vec<AgentEvent> = run(&provider(&script))
        .await
        .into_iter()
        .map(|r| r.expect("no errors"))
        .collect();

    assert_eq!(
        events,
        vec![
            AgentEvent::TextDelta("ok".into()),
            AgentEvent::Done(Some("s-1".into())),
        ]
    );
}

#[tokio::test]
async fn missing_binary_fails_to_open() {
    let provider = CliAgentProvider::new(AgentConfig {
        cli: "/nonexistent/agent-cli".into(),
        ..AgentConfig::default()
    });
    let result = provider.open_turn(TurnRequest::new("hi")).await;
    assert!(matches!(result, Err(AppError::Agent(ref m)) if m.contains("failed to spawn agent")));
}
