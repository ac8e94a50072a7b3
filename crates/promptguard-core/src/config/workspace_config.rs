//! Workspace layout configuration.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_STATE_DIR;
use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// State directory relative to the project root. Default: `.promptguard`.
    pub state_dir: Option<String>,
}

impl WorkspaceConfig {
    pub fn effective_state_dir(&self) -> &str {
        self.state_dir.as_deref().unwrap_or(DEFAULT_STATE_DIR)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(dir) = &self.state_dir else {
            return Ok(());
        };
        let path = Path::new(dir);
        let escapes = path.is_absolute()
            || dir.starts_with('/')
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes || dir.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "workspace.state_dir",
                message: format!("must be a relative path inside the project: {dir}"),
            });
        }
        Ok(())
    }
}
