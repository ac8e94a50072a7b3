//! Error taxonomy.
//! One enum per subsystem, each mapped to a stable error code.

pub mod config_error;
pub mod error_code;
pub mod parse_error;
pub mod scan_error;
pub mod transform_error;

pub use config_error::ConfigError;
pub use error_code::PromptGuardErrorCode;
pub use parse_error::ParseError;
pub use scan_error::ScanError;
pub use transform_error::TransformError;
pub use crate::workspace::errors::{WorkspaceError, WorkspaceResult};
