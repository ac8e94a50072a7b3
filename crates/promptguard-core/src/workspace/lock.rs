//! Project locking via fd-lock.
//! Exclusive write locks serialize every mutation of persisted state.
//! Shared read locks let status and doctor run alongside each other.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;

use super::errors::{WorkspaceError, WorkspaceResult};

/// Proof that the exclusive project lock is held. State and backup
/// mutations take a reference to one.
pub type WriteGuard<'a> = fd_lock::RwLockWriteGuard<'a, File>;
pub type ReadGuard<'a> = fd_lock::RwLockReadGuard<'a, File>;

/// Advisory lock on `<state_dir>/state.lock`.
pub struct ProjectLock {
    lock_file: RwLock<File>,
    lock_path: PathBuf,
}

impl ProjectLock {
    /// Open (creating if needed) the lock file. Does not acquire anything.
    pub fn open(lock_path: &Path) -> WorkspaceResult<Self> {
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| WorkspaceError::from_io(parent, e))?;
        }
        let file = File::options()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| WorkspaceError::from_io(lock_path, e))?;
        Ok(Self {
            lock_file: RwLock::new(file),
            lock_path: lock_path.to_path_buf(),
        })
    }

    /// Acquire the shared lock without blocking.
    pub fn read(&mut self) -> WorkspaceResult<ReadGuard<'_>> {
        self.lock_file.try_read().map_err(|_| WorkspaceError::Locked {
            operation: "read".to_string(),
            message: "A mutating operation is in progress. Try again shortly.".to_string(),
        })
    }

    /// Acquire the exclusive lock without blocking.
    pub fn write(&mut self) -> WorkspaceResult<WriteGuard<'_>> {
        self.lock_file.try_write().map_err(|_| WorkspaceError::Locked {
            operation: "write".to_string(),
            message: "Another operation is in progress. Wait for it to complete.".to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}
