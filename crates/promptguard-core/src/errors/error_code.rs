//! Stable error codes surfaced in reports and consumed by the CLI.

/// Maps an error to a stable, machine-readable code.
pub trait PromptGuardErrorCode {
    fn error_code(&self) -> &'static str;
}

// Parsing
pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const INVALID_UTF8: &str = "INVALID_UTF8";
pub const UNSUPPORTED_LANGUAGE: &str = "UNSUPPORTED_LANGUAGE";
pub const GRAMMAR_ERROR: &str = "GRAMMAR_ERROR";

// Scanning
pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const ROOT_NOT_FOUND: &str = "ROOT_NOT_FOUND";

// Transform
pub const PATTERN_AMBIGUOUS: &str = "PATTERN_AMBIGUOUS";
pub const OVERLAPPING_EDITS: &str = "OVERLAPPING_EDITS";
pub const INVALID_EDIT_RANGE: &str = "INVALID_EDIT_RANGE";

// Config
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CONFIG_PARSE_ERROR: &str = "CONFIG_PARSE_ERROR";

// Workspace
pub const NOT_INITIALIZED: &str = "NOT_INITIALIZED";
pub const ALREADY_INITIALIZED: &str = "ALREADY_INITIALIZED";
pub const PROJECT_DISABLED: &str = "PROJECT_DISABLED";
pub const WORKSPACE_LOCKED: &str = "WORKSPACE_LOCKED";
pub const STATE_STORE_CORRUPT: &str = "STATE_STORE_CORRUPT";
pub const BACKUP_FAILURE: &str = "BACKUP_FAILURE";
pub const BACKUP_NOT_FOUND: &str = "BACKUP_NOT_FOUND";
pub const CHECKSUM_MISMATCH_ON_REVERT: &str = "CHECKSUM_MISMATCH_ON_REVERT";
pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
pub const INVALID_PATH: &str = "INVALID_PATH";
pub const INVALID_API_KEY: &str = "INVALID_API_KEY";
pub const IO_ERROR: &str = "IO_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
