//! Scanner: walks the project tree and yields candidate source files.

pub mod types;
pub mod walker;

pub use types::{DiscoveredFile, ScanItem, SkipReason, SkippedEntry};
pub use walker::{ScanIter, ScanOutcome, Scanner, DEFAULT_IGNORES};
