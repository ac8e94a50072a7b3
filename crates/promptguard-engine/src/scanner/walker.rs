//! File walker built on the `ignore` crate.
//!
//! Honors `.gitignore` and `.promptguardignore` (gitignore syntax,
//! hierarchical), the default ignore list, and configured include/ignore
//! globs. Excluded directories are pruned, never descended into.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crossbeam_channel as channel;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::{Walk, WalkBuilder, WalkState};
use promptguard_core::config::ScanConfig;
use promptguard_core::constants::BINARY_SNIFF_LEN;
use promptguard_core::errors::ScanError;
use promptguard_core::Language;

use super::types::{DiscoveredFile, ScanItem, SkipReason, SkippedEntry};

/// Directories skipped in every scan: version control, dependencies,
/// build output, and virtual environments.
pub const DEFAULT_IGNORES: &[&str] = &[
    "node_modules",
    ".git",
    ".hg",
    ".svn",
    "dist",
    "build",
    "out",
    ".next",
    ".nuxt",
    "coverage",
    "vendor",
    "third_party",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    "site-packages",
];

/// Test sources, skipped unless `scan.skip_tests = false`.
const TEST_IGNORES: &[&str] = &["*.test.*", "*.spec.*", "__tests__", "test_*.py", "*_test.py"];

const IGNORE_FILE_NAME: &str = ".promptguardignore";

/// A configured scan over one project root. Cheap to clone; every call to
/// [`Scanner::iter`] starts a fresh walk.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    config: ScanConfig,
    state_dir: String,
}

/// Result of a full scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<DiscoveredFile>,
    pub skipped: Vec<SkippedEntry>,
}

impl Scanner {
    /// `state_dir` is the project-relative state directory, always excluded.
    pub fn new(root: &Path, config: &ScanConfig, state_dir: &str) -> Result<Self, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        let scanner = Self {
            root: root.to_path_buf(),
            config: config.clone(),
            state_dir: state_dir.trim_end_matches('/').to_string(),
        };
        // Surface bad globs up front rather than on first iteration.
        scanner.overrides()?;
        Ok(scanner)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazy walk in file-name order.
    pub fn iter(&self) -> Result<ScanIter, ScanError> {
        let mut builder = self.builder()?;
        builder.sort_by_file_name(|a, b| a.cmp(b));
        Ok(ScanIter {
            walk: builder.build(),
            root: self.root.clone(),
            max_file_size: self.config.effective_max_file_size(),
        })
    }

    /// Walk the whole tree, sequentially or in parallel per configuration.
    /// Output is sorted by path either way.
    pub fn collect(&self) -> Result<ScanOutcome, ScanError> {
        let items = if self.config.effective_parallel_walk() {
            self.walk_parallel()?
        } else {
            self.iter()?.collect()
        };

        let mut outcome = ScanOutcome::default();
        for item in items {
            match item {
                ScanItem::File(file) => outcome.files.push(file),
                ScanItem::Skipped(skipped) => {
                    tracing::warn!(
                        path = %skipped.path.display(),
                        reason = ?skipped.reason,
                        "entry skipped"
                    );
                    outcome.skipped.push(skipped);
                }
            }
        }
        outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.skipped.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(outcome)
    }

    fn walk_parallel(&self) -> Result<Vec<ScanItem>, ScanError> {
        let (tx, rx) = channel::unbounded();
        let mut builder = self.builder()?;
        let threads = self.config.effective_threads();
        if threads > 0 {
            builder.threads(threads);
        }
        let max_file_size = self.config.effective_max_file_size();

        builder.build_parallel().run(|| {
            let tx = tx.clone();
            let root = self.root.clone();
            Box::new(move |entry| {
                let item = match entry {
                    Ok(entry) => classify_entry(&root, &entry, max_file_size),
                    Err(err) => Some(skipped_from_error(&root, &err)),
                };
                if let Some(item) = item {
                    let _ = tx.send(item);
                }
                WalkState::Continue
            })
        });

        drop(tx);
        Ok(rx.into_iter().collect())
    }

    fn builder(&self) -> Result<WalkBuilder, ScanError> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE_NAME)
            .follow_links(self.config.effective_follow_symlinks())
            .overrides(self.overrides()?);
        Ok(builder)
    }

    /// Include globs are a whitelist; everything else is a negated glob.
    fn overrides(&self) -> Result<Override, ScanError> {
        let mut overrides = OverrideBuilder::new(&self.root);
        let mut add = |pattern: String| {
            overrides
                .add(&pattern)
                .map(|_| ())
                .map_err(|e| ScanError::InvalidPattern {
                    pattern,
                    message: e.to_string(),
                })
        };

        for pattern in &self.config.include {
            add(pattern.clone())?;
        }
        let fixed = DEFAULT_IGNORES
            .iter()
            .copied()
            .chain(std::iter::once(self.state_dir.as_str()));
        for pattern in fixed {
            add(format!("!{pattern}/**"))?;
            add(format!("!{pattern}"))?;
        }
        if self.config.effective_skip_tests() {
            for pattern in TEST_IGNORES {
                add(format!("!{pattern}"))?;
            }
        }
        for pattern in &self.config.extra_ignore {
            add(format!("!{pattern}"))?;
        }

        overrides.build().map_err(|e| ScanError::InvalidPattern {
            pattern: "<overrides>".to_string(),
            message: e.to_string(),
        })
    }
}

/// Lazy scan sequence. Restart by calling [`Scanner::iter`] again.
pub struct ScanIter {
    walk: Walk,
    root: PathBuf,
    max_file_size: u64,
}

impl Iterator for ScanIter {
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        loop {
            let item = match self.walk.next()? {
                Ok(entry) => classify_entry(&self.root, &entry, self.max_file_size),
                Err(err) => Some(skipped_from_error(&self.root, &err)),
            };
            if item.is_some() {
                return item;
            }
        }
    }
}

/// `None` for entries that are silently not candidates (directories,
/// other languages).
fn classify_entry(root: &Path, entry: &ignore::DirEntry, max_file_size: u64) -> Option<ScanItem> {
    if !entry.file_type().is_some_and(|ft| ft.is_file()) {
        return None;
    }
    let path = entry.path();
    let language = Language::from_path(path)?;

    let skipped = |reason| {
        Some(ScanItem::Skipped(SkippedEntry {
            path: path.to_path_buf(),
            reason,
        }))
    };

    let metadata = match entry.metadata() {
        Ok(m) => m,
        Err(e) => return skipped(SkipReason::Unreadable(e.to_string())),
    };
    if metadata.len() > max_file_size {
        return skipped(SkipReason::TooLarge(metadata.len()));
    }
    match looks_binary(path) {
        Ok(true) => return skipped(SkipReason::Binary),
        Ok(false) => {}
        Err(e) => return skipped(SkipReason::Unreadable(e.to_string())),
    }

    Some(ScanItem::File(DiscoveredFile {
        path: path.to_path_buf(),
        rel_path: rel_key(root, path),
        language,
        file_size: metadata.len(),
    }))
}

fn looks_binary(path: &Path) -> std::io::Result<bool> {
    let mut buf = vec![0u8; BINARY_SNIFF_LEN];
    let mut file = File::open(path)?;
    let n = file.read(&mut buf)?;
    Ok(buf[..n].contains(&0))
}

fn rel_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn skipped_from_error(root: &Path, err: &ignore::Error) -> ScanItem {
    ScanItem::Skipped(SkippedEntry {
        path: error_path(err).unwrap_or_else(|| root.to_path_buf()),
        reason: SkipReason::Unreadable(err.to_string()),
    })
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_key_uses_forward_slashes() {
        let root = Path::new("/p");
        assert_eq!(rel_key(root, Path::new("/p/src/lib/a.ts")), "src/lib/a.ts");
    }
}
