//! Domain types shared by every crate in the workspace.

pub mod api_key;
pub mod collections;
pub mod language;
pub mod provider;

pub use api_key::ApiKey;
pub use language::{Language, LanguageFamily};
pub use provider::{recognized_proxy_keys, Provider, ProviderSpec, SdkSurface};
