//! Parse errors. Always file-scoped.

use std::path::PathBuf;

use super::error_code::{self, PromptGuardErrorCode};

/// Errors that can occur while loading or parsing a single source file.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{path}: source is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },

    #[error("{path}: {error_count} syntax error(s), first at {line}:{column}")]
    Syntax {
        path: PathBuf,
        error_count: usize,
        line: usize,
        column: usize,
    },

    #[error("Unsupported language for extension: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("Grammar could not be loaded: {message}")]
    Grammar { message: String },

    #[error("{path}: parser produced no tree")]
    NoTree { path: PathBuf },
}

impl PromptGuardErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUtf8 { .. } => error_code::INVALID_UTF8,
            Self::UnsupportedLanguage { .. } => error_code::UNSUPPORTED_LANGUAGE,
            Self::Grammar { .. } => error_code::GRAMMAR_ERROR,
            Self::Syntax { .. } | Self::NoTree { .. } => error_code::PARSE_ERROR,
        }
    }
}
