//! Project-wide constants.

/// Tool version recorded in persisted state.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Proxy endpoint injected when no other URL is configured.
pub const DEFAULT_PROXY_URL: &str = "https://api.promptguard.co/api/v1/proxy";

/// Credential variable the rewritten code reads.
pub const DEFAULT_ENV_VAR_NAME: &str = "PROMPTGUARD_API_KEY";

/// State directory, relative to the project root.
pub const DEFAULT_STATE_DIR: &str = ".promptguard";

/// Optional project configuration file, relative to the project root.
pub const CONFIG_FILE_NAME: &str = "promptguard.toml";

/// Files inside the state directory.
pub const STATE_FILE_NAME: &str = "state.json";
pub const LOCK_FILE_NAME: &str = "state.lock";
pub const BACKUP_DIR_NAME: &str = "backups";
pub const BACKUP_MANIFEST_NAME: &str = "manifest.json";

/// Persisted schema versions.
pub const STATE_VERSION: u32 = 1;
pub const BACKUP_MANIFEST_VERSION: u32 = 1;

/// Default maximum file size considered by the scanner (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Bytes inspected when sniffing for binary content.
pub const BINARY_SNIFF_LEN: usize = 8_000;
