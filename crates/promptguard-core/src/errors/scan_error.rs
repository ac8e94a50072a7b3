//! Scanner errors. Only a missing root is fatal; per-entry problems are
//! reported as skipped entries instead.

use std::path::PathBuf;

use super::error_code::{self, PromptGuardErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Project root not found or not a directory: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Invalid scan pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl PromptGuardErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RootNotFound { .. } => error_code::ROOT_NOT_FOUND,
            Self::InvalidPattern { .. } => error_code::SCAN_ERROR,
        }
    }
}
