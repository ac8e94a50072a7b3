//! Engine errors.
//!
//! `FileError` is file-scoped: it lands in that file's outcome and never
//! aborts the batch. `EngineError` is project-scoped: the operation stops
//! before mutating anything further.

use std::path::PathBuf;

use promptguard_core::errors::error_code::{self, PromptGuardErrorCode};
use promptguard_core::errors::{ConfigError, ParseError, ScanError, TransformError, WorkspaceError};
use serde::Serialize;

/// Coarse category of a file-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    ParseError,
    BackupFailure,
    ChecksumMismatchOnRevert,
    PermissionDenied,
    Io,
    Transform,
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} changed while the operation was running")]
    ChangedDuringRun { path: String },

    #[error("{path} would keep a base URL entry that does not match the configured proxy URL")]
    ProxyEntryRemains { path: String },
}

impl FileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::Workspace(WorkspaceError::PermissionDenied {
                path: path.display().to_string(),
            })
        } else {
            Self::Io { path, source }
        }
    }

    pub fn kind(&self) -> FileErrorKind {
        match self {
            Self::Parse(_) => FileErrorKind::ParseError,
            Self::Transform(_) => FileErrorKind::Transform,
            Self::Workspace(err) => match err {
                WorkspaceError::BackupFailed { .. } | WorkspaceError::BackupNotFound(_) => {
                    FileErrorKind::BackupFailure
                }
                WorkspaceError::ChecksumMismatch { .. } => FileErrorKind::ChecksumMismatchOnRevert,
                WorkspaceError::PermissionDenied { .. } => FileErrorKind::PermissionDenied,
                _ => FileErrorKind::Io,
            },
            Self::Io { .. } | Self::ChangedDuringRun { .. } => FileErrorKind::Io,
            Self::ProxyEntryRemains { .. } => FileErrorKind::Transform,
        }
    }
}

impl PromptGuardErrorCode for FileError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.error_code(),
            Self::Transform(e) => e.error_code(),
            Self::Workspace(e) => e.error_code(),
            Self::Io { .. } | Self::ChangedDuringRun { .. } => error_code::IO_ERROR,
            Self::ProxyEntryRemains { .. } => error_code::PATTERN_AMBIGUOUS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Proxying is disabled for this project. Run `promptguard enable` first.")]
    ProjectDisabled,
}

impl PromptGuardErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Workspace(e) => e.error_code(),
            Self::Scan(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::ProjectDisabled => error_code::PROJECT_DISABLED,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
