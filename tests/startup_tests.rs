//! Startup checks run by the real binaries
//!
//! None of these reach the network: every case fails (or succeeds) before a
//! provider call would be made.

use std::path::Path;
use std::process::{Command, Output, Stdio};

const CLIENT_SECRETS: &str = r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#;

fn run_binary(binary: &str, env_prefix: &str, config_dir: &Path, args: &[&str]) -> Output {
    Command::new(binary)
        .args(args)
        .env(format!("{}_CONFIG_DIR", env_prefix), config_dir)
        .env_remove(format!("{}_CLIENT_SECRETS_PATH", env_prefix))
        .env_remove(format!("{}_TOKEN_PATH", env_prefix))
        .env_remove(format!("{}_INTERACTIVE", env_prefix))
        .env("RUST_LOG", "off")
        .stdin(Stdio::null())
        .output()
        .expect("binary runs")
}

fn gmail(config_dir: &Path, args: &[&str]) -> Output {
    run_binary(env!("CARGO_BIN_EXE_gmail-mcp-server"), "GMAIL_MCP", config_dir, args)
}

#[test]
fn test_corrupt_credential_file_stops_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("credentials.json"), CLIENT_SECRETS).unwrap();
    std::fs::write(dir.path().join("token.json"), "not json at all").unwrap();

    let output = gmail(dir.path(), &[]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("auth --force"), "stderr: {}", stderr);
    // the corrupt file is left for the operator to inspect
    assert_eq!(
        std::fs::read_to_string(dir.path().join("token.json")).unwrap(),
        "not json at all"
    );
}

#[test]
fn test_missing_session_stops_startup() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("credentials.json"), CLIENT_SECRETS).unwrap();

    let output = gmail(dir.path(), &[]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gmail-mcp-server auth"), "stderr: {}", stderr);
}

#[test]
fn test_missing_client_secrets_stops_startup() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_binary(
        env!("CARGO_BIN_EXE_gdrive-mcp-server"),
        "GDRIVE_MCP",
        dir.path(),
        &[],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GDRIVE_MCP_CLIENT_SECRETS_PATH"), "stderr: {}", stderr);
}

#[test]
fn test_named_account_uses_its_own_token_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("credentials.json"), CLIENT_SECRETS).unwrap();
    std::fs::write(dir.path().join("token.json"), "not json at all").unwrap();

    // the corrupt primary file does not affect the `work` account
    let output = gmail(dir.path(), &["--account", "work"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not authenticated"), "stderr: {}", stderr);
}

#[test]
fn test_notes_auth_points_at_automation_settings() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_binary(
        env!("CARGO_BIN_EXE_apple-notes-mcp-server"),
        "NOTES_MCP",
        dir.path(),
        &["auth"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Automation"), "stderr: {}", stderr);
}
