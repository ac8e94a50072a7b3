//! Transformer errors.

use super::error_code::{self, PromptGuardErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The argument shape cannot be edited without guessing. The match is
    /// skipped and surfaced as a warning.
    #[error("Ambiguous constructor arguments: {reason}")]
    PatternAmbiguous { reason: String },

    #[error("Edits overlap at bytes {first_start}..{first_end} and {second_start}..{second_end}")]
    OverlappingEdits {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    #[error("Edit range {start}..{end} is outside the source (len {len})")]
    InvalidRange { start: usize, end: usize, len: usize },
}

impl TransformError {
    pub fn ambiguous(reason: impl Into<String>) -> Self {
        Self::PatternAmbiguous {
            reason: reason.into(),
        }
    }
}

impl PromptGuardErrorCode for TransformError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PatternAmbiguous { .. } => error_code::PATTERN_AMBIGUOUS,
            Self::OverlappingEdits { .. } => error_code::OVERLAPPING_EDITS,
            Self::InvalidRange { .. } => error_code::INVALID_EDIT_RANGE,
        }
    }
}
