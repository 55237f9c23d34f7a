//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use role_container::config::ShellConfig;
use role_container::role::RoleId;
use role_container::storage::StoreBackend;
use tempfile::TempDir;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("shell.toml");
        Self { temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

fn shell_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("role-container").unwrap();
    cmd.env_remove("ROLESHELL_CONFIG");
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[session]

[container]

[storage]

[logging]
"#,
    );

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[session]
default_role = "student"

[[session.identities]]
id = "amina"
roles = ["farmer", "business"]
active = "farmer"

[container]
dwell_ms = 250
transition_timeout_ms = 5000
clear_on_switch = true

[storage]
namespace = "portal"
backend = "file"
data_dir = "/tmp/role-container-test/data"

[logging]
level = "debug"
max_file_size_mb = 50
max_files = 3
json_format = false
"#,
    );

    let config = ShellConfig::from_file(&fixture.config_path).unwrap();
    assert_eq!(config.session.default_role, RoleId::Student);
    assert_eq!(config.session.identities.len(), 1);
    assert_eq!(config.session.identities[0].active, Some(RoleId::Farmer));
    assert_eq!(config.container.dwell_ms, 250);
    assert!(config.container.clear_on_switch);
    assert_eq!(config.storage.backend, StoreBackend::File);
    assert!(config.validate().is_ok());

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .success();
}

#[test]
fn test_custom_role_catalog() {
    let fixture = ConfigFixture::new();
    let catalog_path = fixture.temp_dir.path().join("roles.toml");
    fs::write(&catalog_path, role_container::role::registry::BUNDLED_CATALOG).unwrap();
    fixture.write_config(&format!(
        "[session]\nrole_catalog = \"{}\"\n",
        catalog_path.display()
    ));

    shell_cmd()
        .args(["roles", "list", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicates::str::contains("farmer"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_namespace_with_separator() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[storage]\nnamespace = \"a:b\"\n");

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("storage.namespace").or(predicates::str::contains("':'")));
}

#[test]
fn test_duplicate_identity() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[[session.identities]]
id = "same"

[[session.identities]]
id = "same"
"#,
    );

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("more than once"));
}

#[test]
fn test_unknown_role_in_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[session]\ndefault_role = \"wizard\"\n");

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("parse"));
}

#[test]
fn test_missing_role_catalog() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[session]\nrole_catalog = \"/nonexistent/roles.toml\"\n");

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Role catalog not found"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"verbose\"\n");

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Invalid log level"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[container\ndwell_ms = ");

    shell_cmd()
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("parse"));
}

// ─────────────────────────────────────────────────────────────────
// Config Show Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[container]
dwell_ms = 1234

[storage]
namespace = "custom-ns"
"#,
    );

    shell_cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicates::str::contains("1234"))
        .stdout(predicates::str::contains("custom-ns"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("new_shell.toml");

    shell_cmd()
        .args(["config", "init", "--path", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("Configuration written"));

    assert!(config_path.exists());

    // The generated file parses back to the defaults
    let config = ShellConfig::from_file(&config_path).unwrap();
    assert_eq!(config.container, ShellConfig::default().container);
    assert_eq!(config.session.identities, ShellConfig::default().session.identities);

    shell_cmd()
        .args(["config", "validate", "--config", config_path.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[session]\n");

    shell_cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("already exists"));
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[storage]\nnamespace = \"old-namespace\"\n");

    shell_cmd()
        .args(["config", "init", "--path", fixture.path(), "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(fixture.path()).unwrap();
    assert!(!content.contains("old-namespace"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Variable Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_container() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[container]\ndwell_ms = 100\n");

    shell_cmd()
        .args(["config", "show", "--config", fixture.path()])
        .env("ROLESHELL_DWELL_MS", "4321")
        .env("ROLESHELL_CLEAR_ON_SWITCH", "true")
        .assert()
        .success()
        .stdout(predicates::str::contains("4321"))
        .stdout(predicates::str::contains("clear_on_switch = true"));
}

#[test]
fn test_env_override_storage() {
    shell_cmd()
        .args(["config", "show"])
        .env("ROLESHELL_NAMESPACE", "env-ns")
        .env("ROLESHELL_STORAGE_BACKEND", "file")
        .assert()
        .success()
        .stdout(predicates::str::contains("env-ns"))
        .stdout(predicates::str::contains("backend = \"file\""));
}

#[test]
fn test_env_override_dwell_is_validated() {
    shell_cmd()
        .args(["config", "validate"])
        .env("ROLESHELL_DWELL_MS", "999999")
        .assert()
        .failure()
        .stderr(predicates::str::contains("dwell_ms"));
}

// ─────────────────────────────────────────────────────────────────
// Path Expansion Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[storage]\ndata_dir = \"~/role-container/data\"\n");

    let config = ShellConfig::load(Some(fixture.path())).unwrap();
    assert!(!config.storage.data_dir.starts_with('~'));
    assert!(config.store_path().ends_with("role-state.json"));
}
