//! State store: atomic read-modify-write of `state.json`.
//!
//! Reads need no lock. Every write takes a [`WriteGuard`], so all mutations
//! for a project pass through the holder of the exclusive lock.

use std::fs;
use std::io;

use tracing::{debug, info};

use crate::constants::STATE_VERSION;
use crate::fs::write_atomic;

use super::errors::{WorkspaceError, WorkspaceResult};
use super::layout::WorkspaceLayout;
use super::lock::{ProjectLock, WriteGuard};
use super::state::ProjectState;

#[derive(Debug, Clone)]
pub struct StateStore {
    layout: WorkspaceLayout,
}

impl StateStore {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn exists(&self) -> bool {
        self.layout.state_file().is_file()
    }

    /// Open the project lock file.
    pub fn open_lock(&self) -> WorkspaceResult<ProjectLock> {
        ProjectLock::open(&self.layout.lock_file())
    }

    /// Load the state, or `None` when the project is uninitialized.
    pub fn load(&self) -> WorkspaceResult<Option<ProjectState>> {
        let path = self.layout.state_file();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(WorkspaceError::StateCorrupt {
                    path: path.display().to_string(),
                    message: "state file is not valid UTF-8".to_string(),
                })
            }
            Err(e) => return Err(WorkspaceError::from_io(&path, e)),
        };

        let state: ProjectState =
            serde_json::from_str(&text).map_err(|e| WorkspaceError::StateCorrupt {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if state.version > STATE_VERSION {
            return Err(WorkspaceError::StateCorrupt {
                path: path.display().to_string(),
                message: format!(
                    "state version {} is newer than supported version {STATE_VERSION}",
                    state.version
                ),
            });
        }
        Ok(Some(state))
    }

    /// Load the state, failing with `NotInitialized` when absent.
    pub fn load_required(&self) -> WorkspaceResult<ProjectState> {
        self.load()?.ok_or(WorkspaceError::NotInitialized)
    }

    /// Persist `state` via temp-file-then-rename.
    pub fn save(&self, _guard: &WriteGuard<'_>, state: &ProjectState) -> WorkspaceResult<()> {
        let path = self.layout.state_file();
        let mut json = serde_json::to_vec_pretty(state)?;
        json.push(b'\n');
        write_atomic(&path, &json).map_err(|e| WorkspaceError::from_io(&path, e))?;
        debug!(path = %path.display(), files = state.files.len(), "state saved");
        Ok(())
    }

    /// Load, mutate in memory, persist. Nothing is written if `mutate` fails.
    pub fn update<F, T>(&self, guard: &WriteGuard<'_>, mutate: F) -> WorkspaceResult<T>
    where
        F: FnOnce(&mut ProjectState) -> WorkspaceResult<T>,
    {
        let mut state = self.load_required()?;
        let out = mutate(&mut state)?;
        self.save(guard, &state)?;
        Ok(out)
    }

    /// Remove the state file, returning the project to uninitialized.
    pub fn delete(&self, _guard: &WriteGuard<'_>) -> WorkspaceResult<()> {
        let path = self.layout.state_file();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "state removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkspaceError::from_io(&path, e)),
        }
    }
}
