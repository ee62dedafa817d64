//! Integration tests for the `blobench` binary.
//!
//! These validate argument parsing, help output, and error handling -- all
//! without requiring a live enclave or metrics backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `blobench` binary with env isolation.
///
/// Clears all `BLOBENCH_*` / `GRAFANA_*` env vars and points config
/// directories at a nonexistent path so tests never touch the user's real
/// configuration.
fn blobench_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("blobench");
    cmd.env("HOME", "/tmp/blobench-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/blobench-cli-test-nonexistent")
        .env_remove("BLOBENCH_ENCLAVE")
        .env_remove("BLOBENCH_SERVICE")
        .env_remove("BLOBENCH_CONFIG")
        .env_remove("GRAFANA_API_TOKEN")
        .env_remove("GRAFANA_DATASOURCE_ID");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = blobench_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_subcommands() {
    blobench_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("min-bandwidth").and(predicate::str::contains("max-blobs")),
    );
}

#[test]
fn test_version_flag() {
    blobench_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("blobench"));
}

// ── Subcommand surfaces ─────────────────────────────────────────────

#[test]
fn test_min_bandwidth_help_shows_flags_and_defaults() {
    blobench_cmd()
        .args(["min-bandwidth", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--blobs")
                .and(predicate::str::contains("--bandwidth"))
                .and(predicate::str::contains("--floor"))
                .and(predicate::str::contains("--decay"))
                .and(predicate::str::contains("default: 6"))
                .and(predicate::str::contains("default: 50")),
        );
}

#[test]
fn test_max_blobs_is_a_placeholder() {
    let output = blobench_cmd().arg("max-blobs").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("not yet implemented"),
        "Expected placeholder message:\n{text}"
    );
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = blobench_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("invalid") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_min_bandwidth_rejects_degenerate_decay() {
    // Validation fires before any enclave access.
    let output = blobench_cmd()
        .args(["min-bandwidth", "--decay", "100"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("decay"),
        "Expected decay validation error:\n{text}"
    );
}

#[test]
fn test_min_bandwidth_rejects_floor_above_initial() {
    let output = blobench_cmd()
        .args(["min-bandwidth", "--bandwidth", "5", "--floor", "50"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("floor"),
        "Expected floor validation error:\n{text}"
    );
}

#[test]
fn test_min_bandwidth_without_enclave_runtime_fails_cleanly() {
    // No kurtosis binary / enclave in the test environment: the command
    // must fail with a setup diagnostic, not hang or panic.
    let output = blobench_cmd()
        .args(["min-bandwidth"])
        .env("PATH", "/tmp/blobench-cli-test-nonexistent")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("kurtosis") || text.contains("Setup") || text.contains("setup"),
        "Expected setup failure mentioning the enclave runtime:\n{text}"
    );
}
