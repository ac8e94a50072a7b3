//! Paths of everything the workspace persists.

use std::path::{Component, Path, PathBuf};

use crate::config::WorkspaceConfig;
use crate::constants::{
    BACKUP_DIR_NAME, BACKUP_MANIFEST_NAME, LOCK_FILE_NAME, STATE_FILE_NAME,
};

use super::errors::{WorkspaceError, WorkspaceResult};

#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: PathBuf,
    state_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: &Path, config: &WorkspaceConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            state_dir: root.join(config.effective_state_dir()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.state_dir.join(BACKUP_DIR_NAME)
    }

    pub fn backup_manifest(&self) -> PathBuf {
        self.backup_dir().join(BACKUP_MANIFEST_NAME)
    }

    /// Project-relative key for `path`, always with `/` separators.
    pub fn relative_key(&self, path: &Path) -> WorkspaceResult<String> {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let key = normalize_key(rel)?;
        Ok(key)
    }

    /// Absolute path of a project-relative key.
    pub fn resolve(&self, key: &str) -> WorkspaceResult<PathBuf> {
        let rel = Path::new(key);
        normalize_key(rel)?;
        Ok(self.root.join(rel))
    }
}

/// Reject absolute paths and `..`; join normal components with `/`.
fn normalize_key(rel: &Path) -> WorkspaceResult<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(WorkspaceError::InvalidPath(rel.display().to_string())),
        }
    }
    if parts.is_empty() {
        return Err(WorkspaceError::InvalidPath(rel.display().to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_keys() {
        let layout = WorkspaceLayout::new(Path::new("/proj"), &WorkspaceConfig::default());
        assert_eq!(
            layout.relative_key(Path::new("/proj/src/./app.ts")).unwrap(),
            "src/app.ts"
        );
        assert!(layout.relative_key(Path::new("../etc/passwd")).is_err());
        assert!(layout.resolve("/etc/passwd").is_err());
        assert_eq!(
            layout.backup_manifest(),
            PathBuf::from("/proj/.promptguard/backups/manifest.json")
        );
    }
}
