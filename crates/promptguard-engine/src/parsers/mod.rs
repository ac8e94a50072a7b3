//! AST providers: source loading and tree-sitter parsing per language family.

pub mod provider;
pub mod source;

pub use provider::{AstProvider, EcmaDialect, SyntaxTree};
pub use source::SourceFile;
