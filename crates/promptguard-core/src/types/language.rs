//! Supported source languages and their grammar families.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A source language the rewriter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

/// Grammar family. TypeScript, TSX and JavaScript share node kinds for
/// everything the detector and transformer touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFamily {
    Ecma,
    Python,
}

impl Language {
    /// Detect language from a file extension (without the dot).
    pub fn from_extension(ext: Option<&str>) -> Option<Self> {
        match ext? {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" | "jsx" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Detect language from a path. Type declaration files are excluded.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
            return None;
        }
        Self::from_extension(path.extension().and_then(|e| e.to_str()))
    }

    pub fn family(self) -> LanguageFamily {
        match self {
            Self::TypeScript | Self::Tsx | Self::JavaScript => LanguageFamily::Ecma,
            Self::Python => LanguageFamily::Python,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_files_are_not_candidates() {
        assert_eq!(Language::from_path(Path::new("src/types.d.ts")), None);
        assert_eq!(
            Language::from_path(Path::new("src/client.ts")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            Language::from_path(Path::new("app/main.py")),
            Some(Language::Python)
        );
        assert_eq!(Language::from_path(Path::new("stubs/openai.pyi")), None);
    }

    #[test]
    fn families() {
        assert_eq!(Language::Tsx.family(), LanguageFamily::Ecma);
        assert_eq!(Language::JavaScript.family(), LanguageFamily::Ecma);
        assert_eq!(Language::Python.family(), LanguageFamily::Python);
    }
}
