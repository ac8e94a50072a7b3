//! Per-file backups of pristine source content.
//!
//! The first mutation of a file copies its bytes to a path-mirrored blob
//! under `<state_dir>/backups/` and records a checksum in the manifest.
//! An existing backup is never replaced, so the oldest known-good copy
//! survives repeated apply/disable/enable cycles.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::constants::BACKUP_MANIFEST_VERSION;
use crate::fs::write_atomic;
use crate::hashing::checksum;

use super::errors::{WorkspaceError, WorkspaceResult};
use super::layout::WorkspaceLayout;
use super::lock::WriteGuard;
use super::now_timestamp;

/// Metadata for one backed-up file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Project-relative path of the original file.
    pub path: String,
    /// Blob location relative to the backup directory.
    pub backup_path: String,
    /// `xxh3:<hex>` of the original bytes.
    pub checksum: String,
    pub size: u64,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackupManifest {
    version: u32,
    #[serde(default)]
    records: BTreeMap<String, BackupRecord>,
}

impl Default for BackupManifest {
    fn default() -> Self {
        Self {
            version: BACKUP_MANIFEST_VERSION,
            records: BTreeMap::new(),
        }
    }
}

/// Result of [`BackupManager::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(BackupRecord),
    /// A backup already existed and was left untouched.
    Existing(BackupRecord),
}

impl BackupOutcome {
    pub fn record(&self) -> &BackupRecord {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    layout: WorkspaceLayout,
}

/// Put `previous` back after a failed restore. Returns whether it stuck.
fn rollback(rel: &str, target: &Path, previous: &[u8]) -> bool {
    match write_atomic(target, previous) {
        Ok(()) => true,
        Err(err) => {
            error!(path = rel, error = %err, "rollback after failed restore did not complete");
            false
        }
    }
}

impl BackupManager {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    /// Back up the current bytes of `rel` unless a backup already exists.
    pub fn backup(&self, guard: &WriteGuard<'_>, rel: &str) -> WorkspaceResult<BackupOutcome> {
        self.backup_inner(guard, rel).map_err(|e| match e {
            WorkspaceError::InvalidPath(_) | WorkspaceError::StateCorrupt { .. } => e,
            other => WorkspaceError::BackupFailed {
                path: rel.to_string(),
                message: other.to_string(),
            },
        })
    }

    fn backup_inner(&self, guard: &WriteGuard<'_>, rel: &str) -> WorkspaceResult<BackupOutcome> {
        let source = self.layout.resolve(rel)?;
        let blob = self.blob_path(rel)?;
        let mut manifest = self.load_manifest()?;

        if let Some(existing) = manifest.records.get(rel) {
            return Ok(BackupOutcome::Existing(existing.clone()));
        }

        // A blob without a record is left over from an interrupted backup.
        // Blobs are written atomically, so adopt it as the oldest copy.
        let bytes = if blob.is_file() {
            warn!(path = rel, "adopting unrecorded backup blob");
            fs::read(&blob).map_err(|e| WorkspaceError::from_io(&blob, e))?
        } else {
            let bytes = fs::read(&source).map_err(|e| WorkspaceError::from_io(&source, e))?;
            write_atomic(&blob, &bytes).map_err(|e| WorkspaceError::from_io(&blob, e))?;
            bytes
        };

        let record = BackupRecord {
            path: rel.to_string(),
            backup_path: rel.to_string(),
            checksum: checksum(&bytes),
            size: bytes.len() as u64,
            created_at: now_timestamp(),
        };
        manifest.records.insert(rel.to_string(), record.clone());
        self.save_manifest(guard, &manifest)?;

        info!(path = rel, checksum = %record.checksum, "backup created");
        Ok(BackupOutcome::Created(record))
    }

    /// Overwrite the working file with its backup.
    ///
    /// The blob is verified against the recorded checksum first; on mismatch
    /// the working file is not touched. After writing, the file is re-read and
    /// checked again; a mismatch there puts the previous bytes back.
    pub fn restore(&self, _guard: &WriteGuard<'_>, rel: &str) -> WorkspaceResult<BackupRecord> {
        let record = self
            .record(rel)?
            .ok_or_else(|| WorkspaceError::BackupNotFound(rel.to_string()))?;
        let blob = self.blob_path(&record.backup_path)?;
        let target = self.layout.resolve(rel)?;

        let original = match fs::read(&blob) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WorkspaceError::BackupNotFound(rel.to_string()))
            }
            Err(e) => return Err(WorkspaceError::from_io(&blob, e)),
        };
        let blob_sum = checksum(&original);
        if blob_sum != record.checksum {
            return Err(WorkspaceError::ChecksumMismatch {
                path: rel.to_string(),
                expected: record.checksum.clone(),
                actual: blob_sum,
            });
        }

        let previous = fs::read(&target).ok();
        write_atomic(&target, &original).map_err(|e| WorkspaceError::from_io(&target, e))?;

        let written = fs::read(&target).map_err(|e| WorkspaceError::from_io(&target, e))?;
        let written_sum = checksum(&written);
        if written_sum != record.checksum {
            if let Some(previous) = previous {
                rollback(rel, &target, &previous);
            }
            return Err(WorkspaceError::ChecksumMismatch {
                path: rel.to_string(),
                expected: record.checksum.clone(),
                actual: written_sum,
            });
        }

        info!(path = rel, "restored from backup");
        Ok(record)
    }

    /// Check that the blob for `rel` still matches its record. Read-only.
    pub fn verify(&self, rel: &str) -> WorkspaceResult<BackupRecord> {
        let record = self
            .record(rel)?
            .ok_or_else(|| WorkspaceError::BackupNotFound(rel.to_string()))?;
        let blob = self.blob_path(&record.backup_path)?;
        let bytes = fs::read(&blob).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => WorkspaceError::BackupNotFound(rel.to_string()),
            _ => WorkspaceError::from_io(&blob, e),
        })?;
        let actual = checksum(&bytes);
        if actual != record.checksum {
            return Err(WorkspaceError::ChecksumMismatch {
                path: rel.to_string(),
                expected: record.checksum,
                actual,
            });
        }
        Ok(record)
    }

    /// The verified pristine bytes of `rel`, if it was ever backed up.
    pub fn read(&self, rel: &str) -> WorkspaceResult<Option<Vec<u8>>> {
        let Some(record) = self.record(rel)? else {
            return Ok(None);
        };
        let blob = self.blob_path(&record.backup_path)?;
        let bytes = fs::read(&blob).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => WorkspaceError::BackupNotFound(rel.to_string()),
            _ => WorkspaceError::from_io(&blob, e),
        })?;
        let actual = checksum(&bytes);
        if actual != record.checksum {
            return Err(WorkspaceError::ChecksumMismatch {
                path: rel.to_string(),
                expected: record.checksum,
                actual,
            });
        }
        Ok(Some(bytes))
    }

    pub fn record(&self, rel: &str) -> WorkspaceResult<Option<BackupRecord>> {
        Ok(self.load_manifest()?.records.remove(rel))
    }

    pub fn records(&self) -> WorkspaceResult<Vec<BackupRecord>> {
        Ok(self.load_manifest()?.records.into_values().collect())
    }

    /// Delete every backup blob and the manifest. Returns the number pruned.
    pub fn prune(&self, _guard: &WriteGuard<'_>) -> WorkspaceResult<usize> {
        let manifest = self.load_manifest()?;
        let count = manifest.records.len();
        let dir = self.layout.backup_dir();
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(WorkspaceError::from_io(&dir, e)),
        }
        info!(count, "backups pruned");
        Ok(count)
    }

    fn blob_path(&self, rel: &str) -> WorkspaceResult<PathBuf> {
        // Reuse key validation so blobs cannot escape the backup dir.
        self.layout.resolve(rel)?;
        Ok(self.layout.backup_dir().join(Path::new(rel)))
    }

    fn load_manifest(&self) -> WorkspaceResult<BackupManifest> {
        let path = self.layout.backup_manifest();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BackupManifest::default()),
            Err(e) => return Err(WorkspaceError::from_io(&path, e)),
        };
        serde_json::from_str(&text).map_err(|e| WorkspaceError::StateCorrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn save_manifest(&self, _guard: &WriteGuard<'_>, manifest: &BackupManifest) -> WorkspaceResult<()> {
        let path = self.layout.backup_manifest();
        let mut json = serde_json::to_vec_pretty(manifest)?;
        json.push(b'\n');
        write_atomic(&path, &json).map_err(|e| WorkspaceError::from_io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_writes_previous_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.ts");
        fs::write(&target, "broken").unwrap();
        assert!(rollback("app.ts", &target, b"previous"));
        assert_eq!(fs::read(&target).unwrap(), b"previous");
    }

    #[test]
    fn failed_rollback_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("src");
        fs::write(&blocker, "").unwrap();
        assert!(!rollback("src/app.ts", &blocker.join("app.ts"), b"previous"));
    }
}
