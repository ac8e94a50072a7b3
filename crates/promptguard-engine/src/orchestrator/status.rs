//! Read-only project status.

use std::collections::BTreeSet;

use promptguard_core::workspace::{
    BackupManager, FileStatus, ProjectState, StateStore, WorkspaceResult,
};
use promptguard_core::Provider;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Uninitialized,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatusEntry {
    pub path: String,
    pub status: FileStatus,
    pub providers: BTreeSet<Provider>,
    pub has_backup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub applied: usize,
    pub disabled: usize,
    pub reverted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub phase: Phase,
    /// Masked, e.g. `pg_sk_prod_****abcd`.
    pub api_key: Option<String>,
    pub proxy_url: Option<String>,
    pub env_var_name: Option<String>,
    pub providers: BTreeSet<Provider>,
    pub files: Vec<FileStatusEntry>,
    pub counts: StatusCounts,
    pub last_applied_at: Option<u64>,
}

impl StatusReport {
    fn uninitialized() -> Self {
        Self {
            phase: Phase::Uninitialized,
            api_key: None,
            proxy_url: None,
            env_var_name: None,
            providers: BTreeSet::new(),
            files: Vec::new(),
            counts: StatusCounts::default(),
            last_applied_at: None,
        }
    }

    fn from_state(state: &ProjectState, backed_up: &BTreeSet<String>) -> Self {
        let files = state
            .files
            .iter()
            .map(|f| FileStatusEntry {
                path: f.path.clone(),
                status: f.status,
                providers: f.providers.clone(),
                has_backup: backed_up.contains(&f.path),
            })
            .collect();
        Self {
            phase: if state.enabled {
                Phase::Enabled
            } else {
                Phase::Disabled
            },
            api_key: Some(state.api_key.masked()),
            proxy_url: Some(state.proxy_url.clone()),
            env_var_name: Some(state.env_var_name.clone()),
            providers: state.providers.clone(),
            files,
            counts: StatusCounts {
                pending: state.count(FileStatus::Pending),
                applied: state.count(FileStatus::Applied),
                disabled: state.count(FileStatus::Disabled),
                reverted: state.count(FileStatus::Reverted),
            },
            last_applied_at: state.last_applied_at,
        }
    }
}

pub(crate) fn project_status(store: &StateStore, backups: &BackupManager) -> WorkspaceResult<StatusReport> {
    let Some(state) = store.load()? else {
        return Ok(StatusReport::uninitialized());
    };
    let backed_up: BTreeSet<String> = backups.records()?.into_iter().map(|r| r.path).collect();
    Ok(StatusReport::from_state(&state, &backed_up))
}
