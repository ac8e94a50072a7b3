//! Loaded source files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use promptguard_core::errors::ParseError;
use promptguard_core::hashing::hash_content;
use promptguard_core::Language;

/// A source file read fresh from disk. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Project-relative path with `/` separators.
    pub rel_path: String,
    pub language: Language,
    pub text: String,
    pub content_hash: u64,
}

/// Why a file could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Parse(ParseError),
}

impl SourceFile {
    pub fn load(path: &Path, rel_path: &str, language: Language) -> Result<Self, LoadError> {
        let bytes = fs::read(path).map_err(LoadError::Io)?;
        let content_hash = hash_content(&bytes);
        let text = String::from_utf8(bytes).map_err(|_| {
            LoadError::Parse(ParseError::InvalidUtf8 {
                path: path.to_path_buf(),
            })
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            rel_path: rel_path.to_string(),
            language,
            text,
            content_hash,
        })
    }

    /// In-memory source, used by tests and dry runs.
    pub fn from_text(rel_path: &str, language: Language, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: PathBuf::from(rel_path),
            rel_path: rel_path.to_string(),
            language,
            content_hash: hash_content(text.as_bytes()),
            text,
        }
    }
}
