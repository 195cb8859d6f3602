//! Error types for Longform sync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=vault, 3=not_found, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Longform operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Vault (exit 2)
    VaultNotFound,

    // Not Found (exit 3)
    DraftNotFound,
    SceneNotFound,
    PathNotFound,

    // Validation (exit 4)
    NotADraft,
    InvalidPath,
    InvalidArgument,
    MalformedMetadata,

    // Conflict (exit 5)
    PathExists,
    ParentMissing,
    WrongPathKind,

    // Sync (exit 6)
    WriteBackFailed,
    WatchError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    YamlError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::VaultNotFound => "VAULT_NOT_FOUND",
            Self::DraftNotFound => "DRAFT_NOT_FOUND",
            Self::SceneNotFound => "SCENE_NOT_FOUND",
            Self::PathNotFound => "PATH_NOT_FOUND",
            Self::NotADraft => "NOT_A_DRAFT",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::MalformedMetadata => "MALFORMED_METADATA",
            Self::PathExists => "PATH_EXISTS",
            Self::ParentMissing => "PARENT_MISSING",
            Self::WrongPathKind => "WRONG_PATH_KIND",
            Self::WriteBackFailed => "WRITE_BACK_FAILED",
            Self::WatchError => "WATCH_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::VaultNotFound => 2,
            Self::DraftNotFound | Self::SceneNotFound | Self::PathNotFound => 3,
            Self::NotADraft | Self::InvalidPath | Self::InvalidArgument | Self::MalformedMetadata => 4,
            Self::PathExists | Self::ParentMissing | Self::WrongPathKind => 5,
            Self::WriteBackFailed | Self::WatchError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
        }
    }

    /// Whether retrying the same operation can succeed.
    ///
    /// A failed write-back is retried on the next mutation cycle, so it
    /// counts as retryable; so do argument mistakes once corrected.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidPath | Self::WriteBackFailed | Self::IoError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Longform sync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No vault found from {start}")]
    VaultNotFound { start: PathBuf },

    #[error("Draft not found: {path}")]
    DraftNotFound { path: String },

    #[error("Scene not found: {path}")]
    SceneNotFound { path: String },

    #[error("Nothing exists at {path}")]
    PathNotFound { path: String },

    #[error("Not a draft: {path} has no usable longform metadata")]
    NotADraft { path: String },

    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed longform metadata in {path}: {message}")]
    MalformedMetadata { path: String, message: String },

    #[error("Path already exists: {path}")]
    PathExists { path: String },

    #[error("Parent directory does not exist: {path}")]
    ParentMissing { path: String },

    #[error("{path} is not a {expected}")]
    WrongPathKind { path: String, expected: &'static str },

    #[error("Failed to write draft metadata for {}: {message}", paths.join(", "))]
    WriteBackFailed { paths: Vec<String>, message: String },

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::VaultNotFound { .. } => ErrorCode::VaultNotFound,
            Self::DraftNotFound { .. } => ErrorCode::DraftNotFound,
            Self::SceneNotFound { .. } => ErrorCode::SceneNotFound,
            Self::PathNotFound { .. } => ErrorCode::PathNotFound,
            Self::NotADraft { .. } => ErrorCode::NotADraft,
            Self::InvalidPath(_) => ErrorCode::InvalidPath,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::MalformedMetadata { .. } => ErrorCode::MalformedMetadata,
            Self::PathExists { .. } => ErrorCode::PathExists,
            Self::ParentMissing { .. } => ErrorCode::ParentMissing,
            Self::WrongPathKind { .. } => ErrorCode::WrongPathKind,
            Self::WriteBackFailed { .. } => ErrorCode::WriteBackFailed,
            Self::Watch(_) => ErrorCode::WatchError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Yaml(_) => ErrorCode::YamlError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::VaultNotFound { .. } => Some(
                "Run inside a vault (a folder containing .obsidian/), \
                 pass --vault <dir>, or set LONGFORM_VAULT."
                    .to_string(),
            ),

            Self::DraftNotFound { path } => Some(format!(
                "No draft indexed at '{path}'. Use `longform drafts` to list known drafts."
            )),

            Self::SceneNotFound { path } => Some(format!(
                "'{path}' is not a scene of any draft. Use `longform scenes <index>` to list scenes."
            )),

            Self::NotADraft { path } => Some(format!(
                "Add a `longform:` block with `format: scenes` or `format: single` to '{path}', \
                 or create one with `longform new`."
            )),

            Self::PathExists { path } => {
                Some(format!("Choose another name; '{path}' is already taken."))
            }

            Self::ParentMissing { path } => {
                Some(format!("Create the folder '{path}' first."))
            }

            Self::WriteBackFailed { .. } => Some(
                "The in-memory drafts were kept; the write is retried on the next change."
                    .to_string(),
            ),

            Self::PathNotFound { .. } | Self::InvalidPath(_)
            | Self::InvalidArgument(_) | Self::MalformedMetadata { .. }
            | Self::WrongPathKind { .. } | Self::Watch(_) | Self::Config(_) | Self::Io(_)
            | Self::Json(_) | Self::Yaml(_) | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
