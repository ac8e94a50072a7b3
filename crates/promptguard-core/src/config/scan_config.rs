//! Scanner configuration.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_FILE_SIZE;

/// Configuration for the file scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum file size in bytes. Default: 1 MiB.
    pub max_file_size: Option<u64>,
    /// Worker threads for analysis. 0 = one per CPU.
    pub threads: Option<usize>,
    /// Include glob patterns. If non-empty, only matching paths are scanned.
    #[serde(default)]
    pub include: Vec<String>,
    /// Additional ignore patterns beyond .gitignore/.promptguardignore.
    #[serde(default)]
    pub extra_ignore: Vec<String>,
    /// Follow symbolic links. Default: false.
    pub follow_symlinks: Option<bool>,
    /// Skip test files and test directories. Default: true.
    pub skip_tests: Option<bool>,
    /// Walk with the parallel walker. Default: false.
    pub parallel_walk: Option<bool>,
}

impl ScanConfig {
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or(0)
    }

    pub fn effective_follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(false)
    }

    pub fn effective_skip_tests(&self) -> bool {
        self.skip_tests.unwrap_or(true)
    }

    pub fn effective_parallel_walk(&self) -> bool {
        self.parallel_walk.unwrap_or(false)
    }
}
