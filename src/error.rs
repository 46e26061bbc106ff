//! Error types for the Job Backup CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=validation, 6=archive, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Per-item apply failures are not errors at this level: they are collected
//! into an [`ApplyResult`](crate::model::ApplyResult) and never fail a request.

use thiserror::Error;
use zip::result::ZipError;

use crate::archive::ExtractError;
use crate::hierarchy::HostError;

/// Result type alias for Job Backup operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    SessionNotFound,
    ItemNotFound,

    // Validation (exit 4)
    MissingSessionId,
    NothingSelected,
    InvalidName,
    InvalidArgument,

    // Conflict (exit 5)
    SessionBusy,
    AlreadyExists,
    ContainerTypeUnavailable,
    HostRejected,

    // Archive (exit 6)
    NoArchive,
    InvalidArchive,
    UnsafeEntry,
    PathEscape,
    NothingImportable,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::MissingSessionId => "MISSING_SESSION_ID",
            Self::NothingSelected => "NOTHING_SELECTED",
            Self::InvalidName => "INVALID_NAME",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::SessionBusy => "SESSION_BUSY",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ContainerTypeUnavailable => "CONTAINER_TYPE_UNAVAILABLE",
            Self::HostRejected => "HOST_REJECTED",
            Self::NoArchive => "NO_ARCHIVE",
            Self::InvalidArchive => "INVALID_ARCHIVE",
            Self::UnsafeEntry => "UNSAFE_ENTRY",
            Self::PathEscape => "PATH_ESCAPE",
            Self::NothingImportable => "NOTHING_IMPORTABLE",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::SessionNotFound | Self::ItemNotFound => 3,
            Self::MissingSessionId
            | Self::NothingSelected
            | Self::InvalidName
            | Self::InvalidArgument => 4,
            Self::SessionBusy
            | Self::AlreadyExists
            | Self::ContainerTypeUnavailable
            | Self::HostRejected => 5,
            Self::NoArchive
            | Self::InvalidArchive
            | Self::UnsafeEntry
            | Self::PathEscape
            | Self::NothingImportable => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input or after waiting.
    ///
    /// True for validation errors and a busy session. False for not-found,
    /// archive, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MissingSessionId
                | Self::NothingSelected
                | Self::InvalidName
                | Self::InvalidArgument
                | Self::SessionBusy
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can fail a whole Job Backup request.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Import session not found: {id}")]
    UnknownSession { id: String },

    #[error("No import session id given")]
    MissingSessionId,

    #[error("Import session {id} is already being applied")]
    SessionBusy { id: String },

    #[error("No archive uploaded")]
    NoArchive,

    #[error("Invalid archive: {0}")]
    InvalidArchive(#[from] ExtractError),

    #[error("The archive contains no importable items")]
    NothingImportable,

    #[error("Nothing selected")]
    NothingSelected,

    #[error("{0}")]
    Host(#[from] HostError),

    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownSession { .. } => ErrorCode::SessionNotFound,
            Self::MissingSessionId => ErrorCode::MissingSessionId,
            Self::SessionBusy { .. } => ErrorCode::SessionBusy,
            Self::NoArchive => ErrorCode::NoArchive,
            Self::InvalidArchive(inner) => match inner {
                ExtractError::UnsafeEntry { .. } => ErrorCode::UnsafeEntry,
                ExtractError::PathEscape { .. } => ErrorCode::PathEscape,
                ExtractError::Archive(_) => ErrorCode::InvalidArchive,
                ExtractError::Io(_) => ErrorCode::IoError,
            },
            Self::NothingImportable => ErrorCode::NothingImportable,
            Self::NothingSelected => ErrorCode::NothingSelected,
            Self::Host(inner) => match inner {
                HostError::NotFound { .. } => ErrorCode::ItemNotFound,
                HostError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
                HostError::ContainerTypeUnavailable => ErrorCode::ContainerTypeUnavailable,
                HostError::InvalidName { .. } => ErrorCode::InvalidName,
                HostError::Rejected(_) => ErrorCode::HostRejected,
                HostError::Io(_) => ErrorCode::IoError,
            },
            Self::Zip(_) => ErrorCode::InvalidArchive,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
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
            Self::UnknownSession { id } => Some(format!(
                "No import session with ID '{id}'. Use `job-backup session list` to see open sessions."
            )),

            Self::MissingSessionId => Some(
                "Pass the session id printed by `job-backup import upload <zip>`".to_string(),
            ),

            Self::SessionBusy { .. } => Some(
                "Another apply is running for this session. Wait for it to finish and retry."
                    .to_string(),
            ),

            Self::NoArchive => Some(
                "Pass a non-empty .zip produced by `job-backup export`".to_string(),
            ),

            Self::NothingImportable => Some(
                "The archive must contain <full-name>/config.xml entries, as written by `job-backup export`"
                    .to_string(),
            ),

            Self::NothingSelected => Some(
                "Select full names or folder prefixes.\n  \
                 Export: job-backup list\n  \
                 Import: job-backup import preview <session-id>"
                    .to_string(),
            ),

            Self::InvalidArchive(ExtractError::UnsafeEntry { .. } | ExtractError::PathEscape { .. }) => {
                Some("The archive has entries outside its root and was rejected. Nothing was imported.".to_string())
            }

            Self::Host(HostError::ContainerTypeUnavailable) => Some(
                "Folder support is disabled for this home (`--no-folders`)".to_string(),
            ),

            Self::Config(_) => Some(
                "Set --home or JOB_BACKUP_HOME to the instance home directory".to_string(),
            ),

            Self::InvalidArchive(_)
            | Self::Host(_)
            | Self::Zip(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
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
