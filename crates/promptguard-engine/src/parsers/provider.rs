//! AST provider: a closed set of parser variants selected by language.
//!
//! Parsers are created per call; a tree-sitter `Parser` is not `Sync` and
//! creating one is cheap next to parsing.

use std::path::Path;

use promptguard_core::errors::ParseError;
use promptguard_core::{Language, LanguageFamily};
use tree_sitter::{Node, Parser, Tree};

/// Grammar dialect within the TS/JS family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcmaDialect {
    TypeScript,
    Tsx,
    JavaScript,
}

/// Parser selected by file language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstProvider {
    Ecma(EcmaDialect),
    Python,
}

/// A successfully parsed, error-free syntax tree.
pub struct SyntaxTree {
    tree: Tree,
    family: LanguageFamily,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn family(&self) -> LanguageFamily {
        self.family
    }
}

impl AstProvider {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::TypeScript => Self::Ecma(EcmaDialect::TypeScript),
            Language::Tsx => Self::Ecma(EcmaDialect::Tsx),
            Language::JavaScript => Self::Ecma(EcmaDialect::JavaScript),
            Language::Python => Self::Python,
        }
    }

    pub fn family(self) -> LanguageFamily {
        match self {
            Self::Ecma(_) => LanguageFamily::Ecma,
            Self::Python => LanguageFamily::Python,
        }
    }

    fn grammar(self) -> tree_sitter::Language {
        match self {
            Self::Ecma(EcmaDialect::TypeScript) => {
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
            }
            Self::Ecma(EcmaDialect::Tsx) => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Ecma(EcmaDialect::JavaScript) => tree_sitter_javascript::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }

    /// Parse `text`. Any syntax error makes the whole file a `ParseError`:
    /// edits are only ever planned against trees that parsed cleanly.
    pub fn parse(self, text: &str, path: &Path) -> Result<SyntaxTree, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| ParseError::Grammar {
                message: e.to_string(),
            })?;

        let tree = parser.parse(text, None).ok_or_else(|| ParseError::NoTree {
            path: path.to_path_buf(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let (error_count, first) = collect_errors(root);
            let (line, column) = first.unwrap_or((0, 0));
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
                error_count,
                line: line + 1,
                column: column + 1,
            });
        }

        Ok(SyntaxTree {
            tree,
            family: self.family(),
        })
    }
}

/// Count ERROR and MISSING nodes; report the first position (0-based).
fn collect_errors(root: Node<'_>) -> (usize, Option<(usize, usize)>) {
    fn visit(node: Node<'_>, count: &mut usize, first: &mut Option<(usize, usize)>) {
        if node.is_error() || node.is_missing() {
            *count += 1;
            if first.is_none() {
                let pos = node.start_position();
                *first = Some((pos.row, pos.column));
            }
            return;
        }
        if !node.has_error() {
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            visit(child, count, first);
        }
    }

    let mut count = 0;
    let mut first = None;
    visit(root, &mut count, &mut first);
    (count, first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_sources_parse() {
        let p = Path::new("x");
        assert!(AstProvider::for_language(Language::TypeScript)
            .parse("const a: number = 1;", p)
            .is_ok());
        assert!(AstProvider::for_language(Language::Tsx)
            .parse("const el = <div>{1}</div>;", p)
            .is_ok());
        assert!(AstProvider::for_language(Language::JavaScript)
            .parse("const a = require('x');", p)
            .is_ok());
        assert!(AstProvider::Python.parse("import os\nx = 1\n", p).is_ok());
    }

    #[test]
    fn syntax_errors_are_file_scoped_parse_errors() {
        let err = AstProvider::Python
            .parse("def broken(:\n    pass\n", Path::new("bad.py"))
            .err()
            .unwrap();
        match err {
            ParseError::Syntax { error_count, line, .. } => {
                assert!(error_count >= 1);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
