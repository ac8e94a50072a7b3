//! On-disk project workspace: state store, advisory lock, and backups.
//!
//! Layout under the project root:
//! ```text
//! .promptguard/state.json            ProjectState
//! .promptguard/state.lock            advisory lock
//! .promptguard/backups/<rel path>    pristine copies
//! .promptguard/backups/manifest.json BackupRecords
//! ```

pub mod backup;
pub mod errors;
pub mod layout;
pub mod lock;
pub mod state;
pub mod store;

pub use backup::{BackupManager, BackupOutcome, BackupRecord};
pub use errors::{WorkspaceError, WorkspaceResult};
pub use layout::WorkspaceLayout;
pub use lock::{ProjectLock, ReadGuard, WriteGuard};
pub use state::{FileStatus, ManagedFile, ProjectState};
pub use store::StateStore;

/// Seconds since the Unix epoch.
pub fn now_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
