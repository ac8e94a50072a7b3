//! PromptGuard API key format.
//!
//! Only the shape is checked here. Whether the key is live is decided by
//! the remote API, which this crate never contacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::workspace::errors::WorkspaceError;

const PREFIXES: &[&str] = &["pg_sk_test_", "pg_sk_prod_"];
const MIN_SECRET_LEN: usize = 16;

/// A validated PromptGuard API key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self, WorkspaceError> {
        let raw = raw.trim();
        let Some(prefix) = PREFIXES.iter().find(|p| raw.starts_with(**p)) else {
            return Err(WorkspaceError::InvalidApiKey {
                reason: "key must start with pg_sk_test_ or pg_sk_prod_".to_string(),
            });
        };
        let secret = &raw[prefix.len()..];
        if secret.len() < MIN_SECRET_LEN {
            return Err(WorkspaceError::InvalidApiKey {
                reason: format!("secret part must be at least {MIN_SECRET_LEN} characters"),
            });
        }
        if !secret
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(WorkspaceError::InvalidApiKey {
                reason: "secret part may only contain letters, digits, '_' and '-'".to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_test_key(&self) -> bool {
        self.0.starts_with("pg_sk_test_")
    }

    /// Key with the secret hidden except for the last four characters,
    /// e.g. `pg_sk_prod_****wxyz`.
    pub fn masked(&self) -> String {
        let prefix_len = PREFIXES
            .iter()
            .find(|p| self.0.starts_with(**p))
            .map_or(0, |p| p.len());
        let tail_start = self.0.len().saturating_sub(4).max(prefix_len);
        format!("{}****{}", &self.0[..prefix_len], &self.0[tail_start..])
    }
}

impl TryFrom<String> for ApiKey {
    type Error = WorkspaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

// Never print the secret through Debug.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_test_and_prod_keys() {
        assert!(ApiKey::parse("pg_sk_test_abcdefghijklmnop").is_ok());
        assert!(ApiKey::parse("pg_sk_prod_ABCDEFGH-1234_xyz").is_ok());
    }

    #[test]
    fn rejects_bad_prefix_and_short_secret() {
        assert!(ApiKey::parse("sk-abcdefghijklmnopqrstuvwxyz").is_err());
        assert!(ApiKey::parse("pg_sk_test_short").is_err());
        assert!(ApiKey::parse("pg_sk_test_has spaces in it!!").is_err());
    }

    #[test]
    fn masking_keeps_prefix_and_tail() {
        let key = ApiKey::parse("pg_sk_prod_abcdefghijklwxyz").unwrap();
        assert_eq!(key.masked(), "pg_sk_prod_****wxyz");
        assert!(!format!("{key:?}").contains("abcdefgh"));
    }
}
