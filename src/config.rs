//! Configuration system for the role shell
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (ROLESHELL_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::role::{RoleId, RoleRegistry};
use crate::storage::{StoreBackend, STORE_FILE};

/// Main shell configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShellConfig {
    /// Session and identity settings
    pub session: SessionSettings,

    /// Container behavior
    pub container: ContainerSettings,

    /// Persisted role state
    pub storage: StorageSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Base role every identity holds; unknown role ids fall back to it
    pub default_role: RoleId,

    /// Role catalog override (bundled catalog when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_catalog: Option<String>,

    /// Identities the static provider can sign in
    pub identities: Vec<IdentitySettings>,
}

/// One sign-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Opaque identity id
    pub id: String,

    /// Roles granted at sign-in
    #[serde(default)]
    pub roles: Vec<RoleId>,

    /// Role active right after sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<RoleId>,
}

/// Container behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Minimum time the loading phase is shown (ms)
    pub dwell_ms: u64,

    /// Upper bound on view resolution (ms, 0 = unbounded)
    pub transition_timeout_ms: u64,

    /// Delete the previous role's keys when switching away from it
    pub clear_on_switch: bool,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Key namespace shared by every role
    pub namespace: String,

    /// Store backend
    pub backend: StoreBackend,

    /// Directory holding the file store
    pub data_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_role: RoleId::Citizen,
            role_catalog: None,
            identities: vec![
                IdentitySettings {
                    id: "demo-farmer".to_string(),
                    roles: vec![RoleId::Farmer, RoleId::Business],
                    active: None,
                },
                IdentitySettings {
                    id: "demo-student".to_string(),
                    roles: vec![RoleId::Student],
                    active: Some(RoleId::Student),
                },
                IdentitySettings {
                    id: "demo-official".to_string(),
                    roles: vec![RoleId::GovernmentOfficial],
                    active: Some(RoleId::GovernmentOfficial),
                },
            ],
        }
    }
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            dwell_ms: 800,
            transition_timeout_ms: 0,
            clear_on_switch: false,
        }
    }
}

impl ContainerSettings {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn transition_timeout(&self) -> Option<Duration> {
        (self.transition_timeout_ms > 0).then(|| Duration::from_millis(self.transition_timeout_ms))
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            namespace: "rolebox".to_string(),
            backend: StoreBackend::Memory,
            data_dir: "~/.role-container/data".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

/// Longest accepted dwell time
const MAX_DWELL_MS: u64 = 10_000;

impl ShellConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse one config file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigNotFound {
            path: path.to_path_buf(),
            source: Some(e),
        })?;
        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })?;
        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // An explicit path must exist.
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            // Current directory
            PathBuf::from("role-container.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("role-container").join("shell.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".role-container").join("shell.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/role-container/shell.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Session settings
        if let Ok(val) = std::env::var("ROLESHELL_DEFAULT_ROLE") {
            if let Ok(role) = val.parse() {
                self.session.default_role = role;
            }
        }
        if let Ok(val) = std::env::var("ROLESHELL_ROLE_CATALOG") {
            self.session.role_catalog = Some(val);
        }

        // Container settings
        if let Ok(val) = std::env::var("ROLESHELL_DWELL_MS") {
            if let Ok(n) = val.parse() {
                self.container.dwell_ms = n;
            }
        }
        if let Ok(val) = std::env::var("ROLESHELL_TRANSITION_TIMEOUT_MS") {
            if let Ok(n) = val.parse() {
                self.container.transition_timeout_ms = n;
            }
        }
        if let Ok(val) = std::env::var("ROLESHELL_CLEAR_ON_SWITCH") {
            self.container.clear_on_switch = val.to_lowercase() == "true" || val == "1";
        }

        // Storage settings
        if let Ok(val) = std::env::var("ROLESHELL_NAMESPACE") {
            self.storage.namespace = val;
        }
        if let Ok(val) = std::env::var("ROLESHELL_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "memory" => self.storage.backend = StoreBackend::Memory,
                "file" => self.storage.backend = StoreBackend::File,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("ROLESHELL_DATA_DIR") {
            self.storage.data_dir = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("ROLESHELL_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);

        if let Some(ref catalog) = self.session.role_catalog {
            self.session.role_catalog = Some(expand_path(catalog));
        }
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let namespace = &self.storage.namespace;
        if namespace.is_empty() {
            return Err(Error::config_field_invalid(
                "storage.namespace",
                "Namespace cannot be empty",
            ));
        }
        if namespace.contains(':') {
            return Err(Error::config_field_invalid(
                "storage.namespace",
                format!("Namespace '{}' must not contain ':'", namespace),
            ));
        }

        if self.container.dwell_ms > MAX_DWELL_MS {
            return Err(Error::config_field_invalid(
                "container.dwell_ms",
                format!("dwell_ms must be at most {}", MAX_DWELL_MS),
            ));
        }

        let mut seen = HashSet::new();
        for identity in &self.session.identities {
            if identity.id.trim().is_empty() || identity.id.contains(':') {
                return Err(Error::config_field_invalid(
                    "session.identities",
                    format!("Invalid identity id '{}'", identity.id),
                ));
            }
            if !seen.insert(identity.id.as_str()) {
                return Err(Error::config_field_invalid(
                    "session.identities",
                    format!("Identity '{}' is defined more than once", identity.id),
                ));
            }
        }

        if let Some(ref catalog) = self.session.role_catalog {
            if !Path::new(catalog).exists() {
                return Err(Error::config_field_invalid(
                    "session.role_catalog",
                    format!("Role catalog not found: {}", catalog),
                ));
            }
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Role catalog, from the override file or bundled
    pub fn load_catalog(&self) -> Result<RoleRegistry> {
        let registry = match self.session.role_catalog {
            Some(ref path) => RoleRegistry::from_path(Path::new(path))?,
            None => RoleRegistry::bundled()?,
        };
        Ok(registry.with_default_role(self.session.default_role))
    }

    /// Get the data directory as a PathBuf
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Path of the JSON file store
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(STORE_FILE)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location for a new config file
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".role-container")
        .join("shell.toml")
}

/// Write a commented default configuration file, returning its path
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Role Container Shell Configuration

[session]
# Base role every identity holds. Unknown role ids fall back to it.
default_role = "citizen"

# Role catalog override. The bundled catalog is used when unset.
# role_catalog = "~/.role-container/roles.toml"

# Identities the shell can sign in
[[session.identities]]
id = "demo-farmer"
roles = ["farmer", "business"]

[[session.identities]]
id = "demo-student"
roles = ["student"]
active = "student"

[[session.identities]]
id = "demo-official"
roles = ["government-official"]
active = "government-official"

[container]
# Minimum time the loading indicator is shown on a role switch (ms)
dwell_ms = 800

# Upper bound on view resolution (ms). 0 waits indefinitely.
transition_timeout_ms = 0

# Delete the previous role's stored keys when switching away from it
clear_on_switch = false

[storage]
# Key namespace: <namespace>:<role>:<identity>:<key>
namespace = "rolebox"

# Store backend: memory or file
backend = "memory"

# Directory holding role-state.json for the file backend
data_dir = "~/.role-container/data"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.role-container/logs/shell.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging (for log aggregation)
json_format = false
"#
    .to_string()
}
