//! CLI integration tests

use std::process::Command;

fn churnctl(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_churnctl"))
        .args(args)
        .env_remove("CHURN_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = churnctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Telco Churn Prediction"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("batch"), "Should show batch command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("info"), "Should show info command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = churnctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("churnctl"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let output = churnctl(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    for flag in [
        "--file",
        "--name",
        "--gender",
        "--age",
        "--estimated-salary",
        "--tenure-months",
        "--province",
        "--provider",
        "--data-used",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test batch subcommand help
#[test]
fn test_batch_help() {
    let output = churnctl(&["batch", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Batch help should succeed");
    assert!(stdout.contains("<FILE>"), "Should show file argument");
    assert!(stdout.contains("--output"), "Should show output option");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = churnctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test api-url option
#[test]
fn test_api_url_option() {
    let output = churnctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("CHURN_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = churnctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Predict without a file requires the customer flags
#[test]
fn test_predict_missing_arguments() {
    let output = churnctl(&["predict", "--name", "Hari"]);
    assert!(!output.status.success(), "Missing arguments should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing arguments"
    );
}

/// A file and customer flags cannot be combined
#[test]
fn test_predict_file_conflicts_with_flags() {
    let output = churnctl(&["predict", "--file", "customer.json", "--name", "Hari"]);
    assert!(!output.status.success(), "Conflicting arguments should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used"), "Should report the conflict");
}

/// Batch requires a file argument
#[test]
fn test_batch_missing_file() {
    let output = churnctl(&["batch"]);
    assert!(!output.status.success(), "Missing file should fail");
}
