//! Project configuration (`promptguard.toml`).
//!
//! Every section is optional; absent values fall back to the defaults in
//! [`crate::constants`] through the `effective_*` accessors.

pub mod proxy_config;
pub mod scan_config;
pub mod workspace_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::CONFIG_FILE_NAME;
use crate::errors::ConfigError;

pub use proxy_config::ProxyConfig;
pub use scan_config::ScanConfig;
pub use workspace_config::WorkspaceConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptGuardConfig {
    pub scan: ScanConfig,
    pub proxy: ProxyConfig,
    pub workspace: WorkspaceConfig,
}

impl PromptGuardConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `promptguard.toml` from the project root, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proxy.validate()?;
        self.workspace.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = PromptGuardConfig::from_toml("").unwrap();
        assert_eq!(config.scan.effective_max_file_size(), 1_048_576);
        assert_eq!(
            config.proxy.effective_base_url(),
            "https://api.promptguard.co/api/v1/proxy"
        );
        assert_eq!(config.proxy.effective_env_var_name(), "PROMPTGUARD_API_KEY");
        assert!(config.proxy.effective_inject_missing_credential());
        assert_eq!(config.workspace.effective_state_dir(), ".promptguard");
    }

    #[test]
    fn sections_parse() {
        let config = PromptGuardConfig::from_toml(
            r#"
            [scan]
            max_file_size = 2048
            extra_ignore = ["generated/**"]
            skip_tests = false

            [proxy]
            base_url = "https://proxy.internal/v1"
            inject_missing_credential = false
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.effective_max_file_size(), 2048);
        assert_eq!(config.scan.extra_ignore, vec!["generated/**".to_string()]);
        assert!(!config.scan.effective_skip_tests());
        assert_eq!(config.proxy.effective_base_url(), "https://proxy.internal/v1");
        assert!(!config.proxy.effective_inject_missing_credential());
    }

    #[test]
    fn rejects_escaping_state_dir() {
        let err = PromptGuardConfig::from_toml("[workspace]\nstate_dir = \"../elsewhere\"\n");
        assert!(err.is_err());
    }
}
