//! Workspace error types.
//! One error enum covering state store, locking, and backup operations.

use std::io;
use std::path::Path;

use crate::errors::error_code::{self, PromptGuardErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    // Initialization
    #[error("Project already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("Project not initialized. Run `promptguard init` first.")]
    NotInitialized,

    // Locking
    #[error("Project locked: {message} (operation: {operation})")]
    Locked { operation: String, message: String },

    // State store
    #[error("State file {path} is corrupt and needs manual inspection: {message}")]
    StateCorrupt { path: String, message: String },

    // Backup
    #[error("Backup of {path} failed: {message}")]
    BackupFailed { path: String, message: String },

    #[error("No backup recorded for {0}")]
    BackupNotFound(String),

    #[error("Checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    // Files
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Path is not inside the project: {0}")]
    InvalidPath(String),

    // Credentials
    #[error("Invalid API key: {reason}")]
    InvalidApiKey { reason: String },

    // IO
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // JSON
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkspaceError {
    /// Map an IO error on `path`, singling out permission failures.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.display().to_string(),
            }
        } else {
            Self::Io(err)
        }
    }
}

impl PromptGuardErrorCode for WorkspaceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized(_) => error_code::ALREADY_INITIALIZED,
            Self::NotInitialized => error_code::NOT_INITIALIZED,
            Self::Locked { .. } => error_code::WORKSPACE_LOCKED,
            Self::StateCorrupt { .. } => error_code::STATE_STORE_CORRUPT,
            Self::BackupFailed { .. } => error_code::BACKUP_FAILURE,
            Self::BackupNotFound(_) => error_code::BACKUP_NOT_FOUND,
            Self::ChecksumMismatch { .. } => error_code::CHECKSUM_MISMATCH_ON_REVERT,
            Self::PermissionDenied { .. } => error_code::PERMISSION_DENIED,
            Self::InvalidPath(_) => error_code::INVALID_PATH,
            Self::InvalidApiKey { .. } => error_code::INVALID_API_KEY,
            Self::Io(_) => error_code::IO_ERROR,
            Self::Json(_) => error_code::SERIALIZATION_ERROR,
        }
    }
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
