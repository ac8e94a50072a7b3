//! # promptguard-core
//!
//! Foundation crate for the PromptGuard SDK rewriter.
//! Defines provider and language types, errors, config, tracing, hashing,
//! atomic file writes, and the on-disk workspace (state, lock, backups).
//! The engine crate depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod fs;
pub mod hashing;
pub mod tracing;
pub mod types;
pub mod workspace;

// Re-export the most commonly used types at the crate root.
pub use config::PromptGuardConfig;
pub use errors::error_code::PromptGuardErrorCode;
pub use types::collections::{FxHashMap, FxHashSet};
pub use types::{ApiKey, Language, LanguageFamily, Provider};
