//! Integration tests for the `opsgenie-notify` command-line driver.
//!
//! Each test writes a config and a message batch to a temp dir and runs a
//! full cycle against a mock alert API.

use std::path::{Path, PathBuf};

use clap::Parser;
use notify::cli::{load_config, run, Args, Outcome};
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

const CRITICAL_BATCH: &str = r#"[{
    "Node": "host1",
    "Service": "db",
    "Check": "disk",
    "Status": "critical",
    "Output": "disk full",
    "ServiceTags": null
}]"#;

/// Clear the variables clap and the config loader read.
fn clear_env() {
    for key in [
        "OPSGENIE_ENABLED",
        "OPSGENIE_CLUSTER_NAME",
        "OPSGENIE_API_KEY",
        "OPSGENIE_API_URL",
    ] {
        std::env::remove_var(key);
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_config(dir: &Path, enabled: bool, api_url: &str) -> PathBuf {
    let config = json!({
        "enabled": enabled,
        "cluster-name": "from-file",
        "api-key": "cli-test-key",
        "api-url": api_url,
    });
    write_file(dir, "notifier.json", &config.to_string())
}

fn args(config: &Path, messages: &Path, extra: &[&str]) -> Args {
    let mut argv = vec![
        "opsgenie-notify".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "--messages".to_string(),
        messages.display().to_string(),
    ];
    argv.extend(extra.iter().map(ToString::to_string));
    Args::try_parse_from(argv).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

/// A successful cycle exits 0.
#[tokio::test]
#[serial]
async fn test_successful_cycle_exits_zero() {
    clear_env();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/alerts"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"requestId": "req-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true, &server.uri());
    let messages = write_file(dir.path(), "messages.json", CRITICAL_BATCH);

    let outcome = run(&args(&config, &messages, &[]), std::io::empty()).await;
    assert_eq!(outcome, Outcome::Sent);
    assert_eq!(outcome.exit_code(), 0);
}

/// A disabled notifier exits 0 and never contacts the API.
#[tokio::test]
#[serial]
async fn test_disabled_notifier_sends_nothing() {
    clear_env();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false, &server.uri());
    let messages = write_file(dir.path(), "messages.json", CRITICAL_BATCH);

    let outcome = run(&args(&config, &messages, &[]), std::io::empty()).await;
    assert_eq!(outcome, Outcome::Disabled);
    assert_eq!(outcome.exit_code(), 0);
}

/// A failing dispatch exits 1.
#[tokio::test]
#[serial]
async fn test_failed_dispatch_exits_one() {
    clear_env();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/alerts"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"requestId": "req-500"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true, &server.uri());
    let messages = write_file(dir.path(), "messages.json", CRITICAL_BATCH);

    let outcome = run(&args(&config, &messages, &[]), std::io::empty()).await;
    assert_eq!(outcome, Outcome::DispatchFailed);
    assert_eq!(outcome.exit_code(), 1);
}

/// Unreadable input exits 2 before any request.
#[tokio::test]
#[serial]
async fn test_bad_input_exits_two() {
    clear_env();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true, &server.uri());
    let garbage = write_file(dir.path(), "messages.json", "not json");

    let outcome = run(&args(&config, &garbage, &[]), std::io::empty()).await;
    assert_eq!(outcome, Outcome::InvalidInput);
    assert_eq!(outcome.exit_code(), 2);

    let missing = dir.path().join("absent.json");
    assert_eq!(
        run(&args(&config, &missing, &[]), std::io::empty()).await,
        Outcome::InvalidInput
    );

    let missing_config = dir.path().join("absent-config.json");
    let messages = write_file(dir.path(), "ok.json", CRITICAL_BATCH);
    assert_eq!(
        run(&args(&missing_config, &messages, &[]), std::io::empty()).await,
        Outcome::InvalidInput
    );
}

/// `--messages -` reads the batch from stdin.
#[tokio::test]
#[serial]
async fn test_messages_from_stdin() {
    clear_env();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/alerts/host1/close"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"requestId": "req-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true, &server.uri());
    let stdin = br#"[{"Node": "host1", "Status": "passing"}]"#;

    let outcome = run(&args(&config, Path::new("-"), &[]), &stdin[..]).await;
    assert_eq!(outcome, Outcome::Sent);
}

/// Flags override the environment, which overrides the config file.
#[test]
#[serial]
fn test_override_precedence() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), true, "https://file.example.com");
    let messages = dir.path().join("messages.json");

    let loaded = load_config(&args(&config, &messages, &[])).unwrap();
    assert_eq!(loaded.cluster_name, "from-file");
    assert_eq!(loaded.api_url, "https://file.example.com");

    std::env::set_var("OPSGENIE_CLUSTER_NAME", "from-env");
    std::env::set_var("OPSGENIE_API_URL", "https://env.example.com");
    let loaded = load_config(&args(&config, &messages, &[])).unwrap();
    assert_eq!(loaded.cluster_name, "from-env");
    assert_eq!(loaded.api_url, "https://env.example.com");

    let loaded = load_config(&args(
        &config,
        &messages,
        &["--cluster-name", "from-flag", "--api-url", "https://flag.example.com"],
    ))
    .unwrap();
    clear_env();

    assert_eq!(loaded.cluster_name, "from-flag");
    assert_eq!(loaded.api_url, "https://flag.example.com");
    assert_eq!(loaded.api_key, "cli-test-key");
    assert!(loaded.enabled);
}

/// Without `--config` the notifier is configured from the environment.
#[test]
#[serial]
fn test_environment_config_without_file() {
    clear_env();
    std::env::set_var("OPSGENIE_ENABLED", "1");
    std::env::set_var("OPSGENIE_API_KEY", "env-key");

    let args = Args::try_parse_from(["opsgenie-notify"]).unwrap();
    let loaded = load_config(&args).unwrap();
    clear_env();

    assert!(loaded.enabled);
    assert_eq!(loaded.api_key, "env-key");
    assert!(loaded.cluster_name.is_empty());
}
