//! CLI integration tests

use std::process::{Command, Output};
use tempfile::TempDir;

fn ssc(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "ssc-cli", "--"])
        .args(args)
        .env_remove("SSC_API_URL")
        .env_remove("SSC_API_KEY")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = ssc(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("EV Station Scorer"), "Should show app name");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("synthesize"), "Should show synthesize command");
    assert!(stdout.contains("inspect"), "Should show inspect command");
    assert!(stdout.contains("score"), "Should show score command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = ssc(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ssc"), "Should show binary name");
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let output = ssc(&["train", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--input"), "Should show input option");
    assert!(stdout.contains("--test-fraction"), "Should show test-fraction option");
    assert!(stdout.contains("--run-log-url"), "Should show run-log-url option");
}

/// Test score subcommand help
#[test]
fn test_score_help() {
    let output = ssc(&["score", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Score help should succeed");
    assert!(stdout.contains("--power-kw"), "Should show power-kw option");
    assert!(stdout.contains("--n-connectors"), "Should show n-connectors option");
}

/// Test that training on a missing file exits non-zero
#[test]
fn test_train_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("absent.csv");
    let artifact = dir.path().join("model.json");

    let output = ssc(&[
        "train",
        "--input",
        input.to_str().unwrap(),
        "--output",
        artifact.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "Training without input should fail");
    assert!(!artifact.exists(), "No artifact should be written");
}

/// Test synthesize, train and inspect end to end
#[test]
fn test_synthesize_train_inspect() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("training_data.csv");
    let artifact = dir.path().join("model.json");

    let output = ssc(&["synthesize", "--output", data.to_str().unwrap(), "--rows", "100"]);
    assert!(output.status.success(), "Synthesize should succeed");
    assert!(data.exists());

    let output = ssc(&[
        "--format",
        "json",
        "train",
        "--input",
        data.to_str().unwrap(),
        "--output",
        artifact.to_str().unwrap(),
        "--model-version",
        "v2-cli",
    ]);
    assert!(output.status.success(), "Train should succeed");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["version"], "v2-cli");
    assert_eq!(report["n_test"], 20);
    assert!(artifact.exists());

    let output = ssc(&["--format", "json", "inspect", artifact.to_str().unwrap()]);
    assert!(output.status.success(), "Inspect should succeed");
    let inspected: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(inspected["artifact"]["version"], "v2-cli");
}

/// Test with invalid command
#[test]
fn test_invalid_command() {
    let output = ssc(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

/// Test score with missing required argument
#[test]
fn test_missing_argument() {
    let output = ssc(&["score", "--power-kw", "50"]);
    assert!(
        !output.status.success(),
        "Missing required arguments should fail"
    );
}
