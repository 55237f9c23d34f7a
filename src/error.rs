//! Error types for the role container
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Error context and chaining
//! - Exit codes for CLI
//!
//! View faults raised inside a container are not errors of this type: the
//! supervisor turns them into [`crate::container::Fault`] values so they never
//! unwind past the container boundary.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Role / session errors (3xx)
    RoleCatalogInvalid = 300,
    UnknownRole = 301,
    NoActiveSession = 302,
    IdentityNotFound = 303,

    // View / container errors (4xx)
    ViewLoadFailed = 400,
    ViewRuntime = 401,

    // Storage errors (5xx)
    StorageRead = 500,
    StorageWrite = 501,
    StorageSerialization = 502,
    InvalidStorageKey = 503,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Role/session errors
            400..=499 => 40, // View/container errors
            500..=599 => 50, // Storage errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for the role container
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Role / Session Errors
    // ─────────────────────────────────────────────────────────────

    /// The role catalog is missing entries or is malformed
    #[error("Invalid role catalog: {reason}")]
    RoleCatalogInvalid { reason: String },

    /// A role id that must be exact (CLI args, config) did not parse
    #[error("Unknown role '{role_id}'")]
    UnknownRole { role_id: String },

    /// An operation needed a signed-in session
    #[error("No active session")]
    NoActiveSession,

    /// The identity provider has no record for this identity
    #[error("Identity not found: {identity_id}")]
    IdentityNotFound { identity_id: String },

    // ─────────────────────────────────────────────────────────────
    // View Errors
    // ─────────────────────────────────────────────────────────────

    /// A view factory failed to produce a view
    #[error("Failed to load view for role {role}: {message}")]
    ViewLoadFailed { role: String, message: String },

    /// A mounted view failed during its lifecycle
    #[error("View for role {role} failed: {message}")]
    ViewRuntime { role: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────

    /// A stored value could not be read back as the requested type
    #[error("Storage read failed for key '{key}': {message}")]
    StorageRead { key: String, message: String },

    /// Writing to the key-value store failed
    #[error("Storage write failed: {message}")]
    StorageWrite { message: String },

    /// JSON (de)serialization of a stored value failed
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A base key that would collide with the derived key layout
    #[error("Invalid storage key '{key}': must be non-empty and must not contain ':'")]
    InvalidStorageKey { key: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::RoleCatalogInvalid { .. } => ErrorCode::RoleCatalogInvalid,
            Error::UnknownRole { .. } => ErrorCode::UnknownRole,
            Error::NoActiveSession => ErrorCode::NoActiveSession,
            Error::IdentityNotFound { .. } => ErrorCode::IdentityNotFound,

            Error::ViewLoadFailed { .. } => ErrorCode::ViewLoadFailed,
            Error::ViewRuntime { .. } => ErrorCode::ViewRuntime,

            Error::StorageRead { .. } => ErrorCode::StorageRead,
            Error::StorageWrite { .. } => ErrorCode::StorageWrite,
            Error::Serialization(_) => ErrorCode::StorageSerialization,
            Error::InvalidStorageKey { .. } => ErrorCode::InvalidStorageKey,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'role-container config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'role-container config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::RoleCatalogInvalid { .. } => Some(
                "Every role needs an entry in the catalog. Remove 'session.role_catalog' to use the bundled one."
            ),
            Error::UnknownRole { .. } => Some(
                "Run 'role-container roles list' to see the available roles."
            ),
            Error::IdentityNotFound { .. } => Some(
                "Add the identity under [[session.identities]] in the configuration file."
            ),
            Error::ViewLoadFailed { .. } => Some(
                "Use reload on the affected role, or switch to another role."
            ),
            Error::StorageWrite { .. } => Some(
                "Check that 'storage.data_dir' exists and is writable."
            ),
            Error::StorageRead { .. } => Some(
                "The stored value has an unexpected shape. Run 'role-container storage clear <role>' to reset it."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a view load failure
    pub fn view_load_failed(role: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::ViewLoadFailed {
            role: role.to_string(),
            message: message.into(),
        }
    }

    /// Create a view runtime failure
    pub fn view_runtime(role: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::ViewRuntime {
            role: role.to_string(),
            message: message.into(),
        }
    }

    /// Create a storage write failure
    pub fn storage_write(message: impl Into<String>) -> Self {
        Error::StorageWrite {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
