//! Environment reads in source code.

use serde::Serialize;

use crate::detectors::ImportBindings;
use crate::parsers::{SourceFile, SyntaxTree};
use crate::patterns::catalog;
use crate::patterns::ShapeMatcher;
use crate::transform::lookup_from_captures;
use promptguard_core::LanguageFamily;

/// A direct read of a named variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvUsage {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub name: String,
}

/// Every `process.env.NAME`, `process.env["NAME"]`, `os.environ[...]`,
/// `os.environ.get(...)`, and `os.getenv(...)` with a literal name.
pub fn env_usages(file: &SourceFile, tree: &SyntaxTree, bindings: &ImportBindings) -> Vec<EnvUsage> {
    let family = tree.family();
    let shapes = match family {
        LanguageFamily::Ecma => catalog::ecma_env_usage_shapes(),
        LanguageFamily::Python => catalog::python_env_shapes(&bindings.env_access_names()),
    };
    let mut matcher = ShapeMatcher::new();
    for shape in shapes {
        matcher.add((), shape);
    }

    let source = file.text.as_bytes();
    matcher
        .find_all(tree.root(), source)
        .into_iter()
        .filter_map(|hit| {
            let lookup = lookup_from_captures(&hit.captures, source, family)?;
            let pos = hit.node.start_position();
            Some(EnvUsage {
                path: file.rel_path.clone(),
                line: pos.row + 1,
                column: pos.column + 1,
                name: lookup.name,
            })
        })
        .collect()
}
