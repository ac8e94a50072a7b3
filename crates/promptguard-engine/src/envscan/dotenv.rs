//! `.env` discovery and parsing.
//!
//! Only names are kept. Values are secrets and never leave this module;
//! a definition records whether it has one.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::Serialize;

use crate::scanner::DEFAULT_IGNORES;

/// File names treated as env files.
pub const ENV_FILE_NAMES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".env.test",
    ".env.example",
];

/// Env files deeper than this below the root are not looked at.
const MAX_DEPTH: usize = 3;

/// One `NAME=value` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvDefinition {
    pub path: String,
    pub line: usize,
    pub name: String,
    pub has_value: bool,
}

/// Env files under `root`, in path order. Ignore files are not honored
/// since env files are usually gitignored; dependency and build
/// directories and `state_dir` are pruned.
pub fn find_env_files(root: &Path, state_dir: &Path) -> Vec<PathBuf> {
    let state_dir = state_dir.to_path_buf();
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .max_depth(Some(MAX_DEPTH))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !DEFAULT_IGNORES.iter().any(|d| name == *d) && entry.path() != state_dir
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping entry during env file discovery");
                continue;
            }
        };
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        let name = entry.file_name().to_string_lossy();
        if is_file && ENV_FILE_NAMES.iter().any(|n| name == *n) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

/// Definitions from every env file under `root`. Unreadable files are
/// logged and skipped.
pub fn load_definitions(root: &Path, state_dir: &Path) -> (Vec<String>, Vec<EnvDefinition>) {
    let mut paths = Vec::new();
    let mut definitions = Vec::new();
    for path in find_env_files(root, state_dir) {
        let rel = relative(root, &path);
        match fs::read_to_string(&path) {
            Ok(text) => definitions.extend(parse_dotenv(&rel, &text)),
            Err(err) => {
                tracing::warn!(path = %rel, error = %err, "could not read env file");
                continue;
            }
        }
        paths.push(rel);
    }
    (paths, definitions)
}

/// Parse `.env` text. Blank lines, comments, and lines that are not an
/// assignment to a valid name are skipped. `export NAME=...` is accepted.
pub fn parse_dotenv(rel: &str, text: &str) -> Vec<EnvDefinition> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(trimmed);
        let Some((name, value)) = trimmed.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if !is_valid_name(name) {
            continue;
        }
        out.push(EnvDefinition {
            path: rel.to_string(),
            line: idx + 1,
            name: name.to_string(),
            has_value: !value_text(value.trim()).is_empty(),
        });
    }
    out
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The value without surrounding quotes, or without a trailing ` # comment`
/// when unquoted.
fn value_text(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            return match rest.find(quote) {
                Some(end) => &rest[..end],
                None => rest,
            };
        }
    }
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end(),
        None => raw,
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_without_keeping_values() {
        let text = "# keys\nOPENAI_API_KEY=sk-123\nexport PROMPTGUARD_API_KEY=\"pg_sk_x\"\n\nEMPTY=\nQUOTED_EMPTY=''\nCOMMENTED= # nothing\nnot an assignment\n1BAD=x\n";
        let defs = parse_dotenv(".env", text);
        let summary: Vec<(&str, usize, bool)> = defs
            .iter()
            .map(|d| (d.name.as_str(), d.line, d.has_value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("OPENAI_API_KEY", 2, true),
                ("PROMPTGUARD_API_KEY", 3, true),
                ("EMPTY", 5, false),
                ("QUOTED_EMPTY", 6, false),
                ("COMMENTED", 7, false),
            ]
        );
        assert!(!format!("{defs:?}").contains("sk-123"));
    }

    #[test]
    fn discovery_prunes_dependencies_and_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let state_dir = root.join(".promptguard");
        for rel in [
            ".env",
            "apps/web/.env.local",
            "node_modules/pkg/.env",
            ".promptguard/.env",
            "a/b/c/d/.env",
            "config/.env.sample",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "X=1\n").unwrap();
        }

        let found: Vec<String> = find_env_files(root, &state_dir)
            .iter()
            .map(|p| relative(root, p))
            .collect();
        assert_eq!(found, vec![".env", "apps/web/.env.local"]);
    }
}
