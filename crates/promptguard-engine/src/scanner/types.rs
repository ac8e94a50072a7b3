//! Scanner output types.

use std::path::PathBuf;

use promptguard_core::Language;
use serde::Serialize;

/// A candidate source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Project-relative path with `/` separators.
    pub rel_path: String,
    pub language: Language,
    pub file_size: u64,
}

/// Why an entry was not yielded as a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    TooLarge(u64),
    Binary,
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// One step of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    File(DiscoveredFile),
    Skipped(SkippedEntry),
}
