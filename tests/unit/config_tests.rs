use std::io::Write;
use std::time::Duration;

use edu_assistant::{config::GlobalConfig, AppError};

fn sample_toml() -> &'static str {
    r#"
http_host = "0.0.0.0"
http_port = 9000
db_path = "var/chat.db"

[agent]
cli = "claude"
args = ["--model", "sonnet"]
allowed_tools = ["WebSearch", "WebFetch"]
workdir = "/srv/agent"

[stream]
idle_timeout_seconds = 120
channel_capacity = 32
keep_alive_seconds = 0

[identity]
url = "https://project.example.co"
"#
}

fn minimal_toml() -> &'static str {
    r#"
[identity]
url = "https://project.example.co"
"#
}

#[test]
fn parses_valid_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("config parses");

    assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    assert_eq!(config.db_path, std::path::PathBuf::from("var/chat.db"));
    assert_eq!(config.agent.args, vec!["--model", "sonnet"]);
    assert_eq!(config.agent.allowed_tools, vec!["WebSearch", "WebFetch"]);
    assert_eq!(
        config.agent.workdir.as_deref(),
        Some(std::path::Path::new("/srv/agent"))
    );
    assert_eq!(config.stream.idle_timeout(), Duration::from_secs(120));
    assert_eq!(config.stream.channel_capacity, 32);
    assert_eq!(config.stream.keep_alive(), None);
    assert!(
        config.identity.api_key.is_empty(),
        "api key is never read from TOML"
    );
}

#[test]
fn applies_defaults() {
    let config = GlobalConfig::from_toml_str(minimal_toml()).expect("config parses");

    assert_eq!(config.bind_addr(), "127.0.0.1:8000");
    assert_eq!(config.agent.cli, "claude");
    assert_eq!(config.agent.allowed_tools, vec!["WebSearch"]);
    assert!(config.agent.args.is_empty());
    assert_eq!(config.stream.idle_timeout(), Duration::from_secs(600));
    assert_eq!(config.stream.channel_capacity, 256);
    assert_eq!(config.stream.keep_alive(), Some(Duration::from_secs(15)));
}

#[test]
fn rejects_missing_identity_section() {
    let result = GlobalConfig::from_toml_str("http_port = 8000\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn rejects_zero_idle_timeout() {
    let toml = format!("{}\n[stream]\nidle_timeout_seconds = 0\n", minimal_toml());
    let err = GlobalConfig::from_toml_str(&toml).expect_err("zero timeout rejected");
    assert!(err.to_string().contains("idle_timeout_seconds"));
}

#[test]
fn rejects_zero_channel_capacity() {
    let toml = format!("{}\n[stream]\nchannel_capacity = 0\n", minimal_toml());
    let err = GlobalConfig::from_toml_str(&toml).expect_err("zero capacity rejected");
    assert!(err.to_string().contains("channel_capacity"));
}

#[test]
fn rejects_empty_agent_cli() {
    let toml = format!("{}\n[agent]\ncli = \"  \"\n", minimal_toml());
    let err = GlobalConfig::from_toml_str(&toml).expect_err("empty cli rejected");
    assert!(err.to_string().contains("agent.cli"));
}

#[test]
fn rejects_empty_identity_url() {
    let err = GlobalConfig::from_toml_str("[identity]\nurl = \"\"\n").expect_err("empty url");
    assert!(err.to_string().contains("identity.url"));
}

#[test]
fn rejects_invalid_field_type() {
    let toml = format!("http_port = \"not-a-number\"\n{}", minimal_toml());
    let err = GlobalConfig::from_toml_str(&toml).expect_err("bad type rejected");
    assert!(err.to_string().starts_with("config: invalid config"));
}

#[test]
fn loads_from_file_path() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(sample_toml().as_bytes()).expect("write config");

    let config = GlobalConfig::load_from_path(file.path()).expect("config loads");
    assert_eq!(config.http_port, 9000);
}

#[test]
fn missing_file_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(temp.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(ref m)) if m.contains("failed to read config")));
}
