//! Proxy rewrite configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ENV_VAR_NAME, DEFAULT_PROXY_URL};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL injected into client constructors.
    pub base_url: Option<String>,
    /// Env var the rewritten credential lookup reads.
    pub env_var_name: Option<String>,
    /// Insert a credential argument when the constructor has none. Default: true.
    pub inject_missing_credential: Option<bool>,
}

impl ProxyConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_PROXY_URL)
    }

    pub fn effective_env_var_name(&self) -> &str {
        self.env_var_name.as_deref().unwrap_or(DEFAULT_ENV_VAR_NAME)
    }

    pub fn effective_inject_missing_credential(&self) -> bool {
        self.inject_missing_credential.unwrap_or(true)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.base_url {
            validate_proxy_url(url)?;
        }
        if let Some(name) = &self.env_var_name {
            validate_env_var_name(name)?;
        }
        Ok(())
    }
}

/// The URL is spliced into source as a string literal, so it must be a
/// plain http(s) URL with no quote, backslash, or whitespace characters.
pub fn validate_proxy_url(url: &str) -> Result<(), ConfigError> {
    let scheme_ok = url.starts_with("https://") || url.starts_with("http://");
    let chars_ok = !url
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '`'));
    if scheme_ok && chars_ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: "proxy.base_url",
            message: format!("not a plain http(s) URL: {url}"),
        })
    }
}

/// Env var names are spliced in as identifiers (`process.env.NAME`).
pub fn validate_env_var_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: "proxy.env_var_name",
            message: format!("not a valid identifier: {name}"),
        })
    }
}
