//! Persisted project state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::{STATE_VERSION, TOOL_VERSION};
use crate::types::{ApiKey, Provider};

use super::now_timestamp;

/// Lifecycle of one managed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Planned; may or may not have been backed up yet.
    Pending,
    /// Proxy edits are in the working file.
    Applied,
    /// Proxy edits were reversed by disable.
    Disabled,
    /// Restored from backup during a revert that did not fully complete.
    Reverted,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Disabled => "disabled",
            Self::Reverted => "reverted",
        }
    }
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFile {
    /// Project-relative path with `/` separators.
    pub path: String,
    pub status: FileStatus,
    pub providers: BTreeSet<Provider>,
}

/// The single source of truth persisted in `state.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub version: u32,
    pub api_key: ApiKey,
    pub proxy_url: String,
    pub env_var_name: String,
    pub providers: BTreeSet<Provider>,
    pub enabled: bool,
    #[serde(default)]
    pub files: Vec<ManagedFile>,
    pub created_at: u64,
    #[serde(default)]
    pub last_applied_at: Option<u64>,
    pub tool_version: String,
}

impl ProjectState {
    pub fn new(
        api_key: ApiKey,
        proxy_url: impl Into<String>,
        env_var_name: impl Into<String>,
        providers: BTreeSet<Provider>,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            api_key,
            proxy_url: proxy_url.into(),
            env_var_name: env_var_name.into(),
            providers,
            enabled: true,
            files: Vec::new(),
            created_at: now_timestamp(),
            last_applied_at: None,
            tool_version: TOOL_VERSION.to_string(),
        }
    }

    pub fn file(&self, path: &str) -> Option<&ManagedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn status_of(&self, path: &str) -> Option<FileStatus> {
        self.file(path).map(|f| f.status)
    }

    /// Insert or update a roster entry. Providers accumulate.
    pub fn upsert_file(
        &mut self,
        path: &str,
        providers: impl IntoIterator<Item = Provider>,
        status: FileStatus,
    ) {
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(entry) => {
                entry.status = status;
                entry.providers.extend(providers);
            }
            None => {
                self.files.push(ManagedFile {
                    path: path.to_string(),
                    status,
                    providers: providers.into_iter().collect(),
                });
                self.files.sort_by(|a, b| a.path.cmp(&b.path));
            }
        }
    }

    /// Update the status of an existing entry. Returns false if absent.
    pub fn set_status(&mut self, path: &str, status: FileStatus) -> bool {
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove_file(&mut self, path: &str) -> Option<ManagedFile> {
        let idx = self.files.iter().position(|f| f.path == path)?;
        Some(self.files.remove(idx))
    }

    pub fn paths_with_status(&self, status: FileStatus) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.status == status)
            .map(|f| f.path.clone())
            .collect()
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ProjectState {
        ProjectState::new(
            ApiKey::parse("pg_sk_test_0123456789abcdef").unwrap(),
            "https://api.promptguard.co/api/v1/proxy",
            "PROMPTGUARD_API_KEY",
            Provider::ALL.into_iter().collect(),
        )
    }

    #[test]
    fn upsert_keeps_roster_sorted_and_merges_providers() {
        let mut s = state();
        s.upsert_file("src/b.ts", [Provider::OpenAI], FileStatus::Pending);
        s.upsert_file("src/a.py", [Provider::Cohere], FileStatus::Pending);
        s.upsert_file("src/b.ts", [Provider::Anthropic], FileStatus::Applied);

        let paths: Vec<_> = s.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.py", "src/b.ts"]);
        let b = s.file("src/b.ts").unwrap();
        assert_eq!(b.status, FileStatus::Applied);
        assert_eq!(b.providers.len(), 2);
    }

    #[test]
    fn serializes_statuses_lowercase() {
        let mut s = state();
        s.upsert_file("app.py", [Provider::OpenAI], FileStatus::Disabled);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"status\":\"disabled\""));
        assert!(json.contains("\"providers\":[\"openai\"]"));
        let back: ProjectState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
