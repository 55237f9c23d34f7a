//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the role-container binary
fn shell_cmd() -> Command {
    let mut cmd = Command::cargo_bin("role-container").unwrap();
    cmd.env_remove("ROLESHELL_CONFIG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    shell_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Role Container"))
        .stdout(predicate::str::contains("roles"))
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("storage"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    shell_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("role-container"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_short_version_flag() {
    shell_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("role-container"));
}

// ─────────────────────────────────────────────────────────────────
// Roles Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_roles_list() {
    shell_cmd()
        .args(["roles", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("citizen"))
        .stdout(predicate::str::contains("government-official"))
        .stdout(predicate::str::contains("all sectors (monitor)"));
}

#[test]
fn test_roles_list_json() {
    let output = shell_cmd()
        .args(["roles", "list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let roles: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let roles = roles.as_array().unwrap();
    assert_eq!(roles.len(), 5);
    assert_eq!(roles[0]["id"], "citizen");
    assert_eq!(roles[4]["can_monitor"], true);
}

#[test]
fn test_roles_show_unknown_falls_back() {
    shell_cmd()
        .args(["roles", "show", "wizard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Role:        citizen"));
}

#[test]
fn test_roles_access() {
    shell_cmd()
        .args(["roles", "access", "farmer", "agriculture"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"));

    shell_cmd()
        .args(["roles", "access", "student", "agriculture"])
        .assert()
        .success()
        .stdout(predicate::str::contains("denied"));

    shell_cmd()
        .args(["roles", "access", "government-official", "anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"));
}

// ─────────────────────────────────────────────────────────────────
// Simulate Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_simulate_switch() {
    shell_cmd()
        .args([
            "simulate",
            "--identity",
            "demo-farmer",
            "--switch",
            "farmer",
            "--dwell-ms",
            "0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("switch farmer"))
        .stdout(predicate::str::contains("view Farmer"));
}

#[test]
fn test_simulate_json_timeline() {
    let output = shell_cmd()
        .args([
            "simulate",
            "--identity",
            "demo-student",
            "--switch",
            "business",
            "--note",
            "file taxes",
            "--dwell-ms",
            "0",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let timeline: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(timeline["identity"], "demo-student");

    let entries = timeline["entries"].as_array().unwrap();
    assert_eq!(entries[0]["step"], "sign-in");
    assert_eq!(entries[0]["status"]["phase"], "transitioning");

    let last = entries.last().unwrap();
    assert_eq!(last["step"], "note");
    assert_eq!(last["status"]["current_role"], "business");
    assert_eq!(last["view"]["notes"], serde_json::json!(["file taxes"]));
}

#[test]
fn test_simulate_contains_failing_view() {
    let output = shell_cmd()
        .args([
            "simulate",
            "--identity",
            "demo-student",
            "--switch",
            "farmer",
            "--fail",
            "farmer",
            "--switch",
            "student",
            "--dwell-ms",
            "0",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let timeline: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let entries = timeline["entries"].as_array().unwrap();
    assert_eq!(entries[3]["status"]["phase"], "errored");
    assert_eq!(entries[3]["view"]["kind"], "fallback");

    let last = entries.last().unwrap();
    assert_eq!(last["status"]["phase"], "idle");
    assert_eq!(last["status"]["current_role"], "student");
}

#[test]
fn test_simulate_unknown_identity() {
    shell_cmd()
        .args(["simulate", "--identity", "nobody", "--dwell-ms", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Identity not found"));
}

#[test]
fn test_simulate_rejects_unknown_role() {
    shell_cmd()
        .args(["simulate", "--identity", "demo-farmer", "--switch", "wizard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wizard"));
}

#[test]
fn test_simulate_rejects_long_dwell() {
    shell_cmd()
        .args(["simulate", "--identity", "demo-farmer", "--dwell-ms", "60000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dwell_ms"));
}

// ─────────────────────────────────────────────────────────────────
// Storage Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_storage_keys_after_file_backed_run() {
    let data_dir = TempDir::new().unwrap();
    let data_path = data_dir.path().to_str().unwrap();

    shell_cmd()
        .env("ROLESHELL_STORAGE_BACKEND", "file")
        .env("ROLESHELL_DATA_DIR", data_path)
        .args([
            "simulate",
            "--identity",
            "demo-farmer",
            "--switch",
            "farmer",
            "--dwell-ms",
            "0",
        ])
        .assert()
        .success();

    shell_cmd()
        .env("ROLESHELL_DATA_DIR", data_path)
        .args(["storage", "keys", "--role", "farmer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rolebox:farmer:demo-farmer:visits"))
        .stdout(predicate::str::contains("rolebox:citizen").not());

    shell_cmd()
        .env("ROLESHELL_DATA_DIR", data_path)
        .args(["storage", "clear", "farmer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("for role farmer"));

    shell_cmd()
        .env("ROLESHELL_DATA_DIR", data_path)
        .args(["storage", "keys", "--role", "farmer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys stored"));

    // Other roles are untouched
    shell_cmd()
        .env("ROLESHELL_DATA_DIR", data_path)
        .args(["storage", "keys", "--role", "citizen"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rolebox:citizen:demo-farmer:visits"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    shell_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[session]"))
        .stdout(predicate::str::contains("[container]"))
        .stdout(predicate::str::contains("[storage]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_default() {
    // Default config should always be valid
    shell_cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    shell_cmd()
        .args(["config", "validate", "--config", "/nonexistent/path/shell.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_init_help() {
    shell_cmd()
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"))
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_flag() {
    shell_cmd()
        .args(["-v", "roles", "list"])
        .assert()
        .success();
}

#[test]
fn test_quiet_flag_keeps_stdout() {
    shell_cmd()
        .args(["-q", "roles", "access", "farmer", "trade"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"))
        .stderr(predicate::str::is_empty());
}

// ─────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_command() {
    shell_cmd()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_subcommand() {
    shell_cmd().assert().failure();
}
