//! Custom error types for roo-task-man
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for roo-task-man operations
#[derive(Error, Debug)]
pub enum TaskManError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors, including archive read/write failures
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid arguments or input data
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required file or directory does not exist
    #[error("{what} not found: {}", .path.display())]
    PathNotFound { what: &'static str, path: PathBuf },

    /// The archive has no manifest entry
    #[error("Manifest missing in {}", .0.display())]
    ManifestMissing(PathBuf),

    /// The archive manifest could not be parsed or lacks required fields
    #[error("Invalid manifest in {}: {reason}", .path.display())]
    ManifestInvalid { path: PathBuf, reason: String },

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// The state database stayed locked past the busy timeout
    #[error("State database is locked: {} (close the editor and retry)", .path.display())]
    LockTimeout { path: PathBuf },

    /// A state database transaction could not complete
    #[error("Failed to update {}: {reason}", .path.display())]
    WriteFailure { path: PathBuf, reason: String },

    /// The primary state file was committed but the mirror update failed
    #[error(
        "Primary state updated but mirror {} was not; files have diverged \
         (do not retry; restore backup {suffix} to undo): {cause}",
        .mirror.display()
    )]
    StateDiverged {
        mirror: PathBuf,
        suffix: String,
        #[source]
        cause: Box<TaskManError>,
    },

    /// Some imported IDs had no matching task on disk
    #[error("{} imported task(s) could not be loaded for registration: {}", .missing.len(), .missing.join(", "))]
    PartialRegistration { missing: Vec<String> },

    /// IDs expected in taskHistory were not found on read-back
    #[error("{} missing from {}: {}", .missing.len(), .file.display(), .missing.join(", "))]
    VerificationMismatch { file: PathBuf, missing: Vec<String> },
}

impl TaskManError {
    /// Create a "not found" error for tasks
    pub fn task_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Task",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for state backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Build a `WriteFailure` for the given state file
    pub fn write_failure(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify a SQLite error raised while mutating `path`
    ///
    /// Busy and locked result codes mean the editor still holds the database.
    pub fn from_sqlite(path: impl Into<PathBuf>, err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::LockTimeout { path: path.into() }
            }
            _ => Self::write_failure(path, err),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::PathNotFound { .. })
    }

    /// Check if this error came from a malformed archive
    pub fn is_manifest_error(&self) -> bool {
        matches!(self, Self::ManifestMissing(_) | Self::ManifestInvalid { .. })
    }

    /// Whether this value is a non-fatal integrity warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::PartialRegistration { .. } | Self::VerificationMismatch { .. }
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for TaskManError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TaskManError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for TaskManError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Io(format!("archive: {}", err))
    }
}

impl From<walkdir::Error> for TaskManError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for roo-task-man operations
pub type TaskManResult<T> = Result<T, TaskManError>;
