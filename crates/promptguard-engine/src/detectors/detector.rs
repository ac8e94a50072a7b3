//! Constructor detection.
//!
//! Per file: collect import bindings, instantiate one constructor shape per
//! provider with the local names that resolve to it, run them all in a single
//! walk, and report calls through ambiguous names as warnings.

use std::collections::BTreeSet;

use promptguard_core::types::recognized_proxy_keys;
use promptguard_core::{LanguageFamily, Provider};
use tree_sitter::Node;

use crate::parsers::{SourceFile, SyntaxTree};
use crate::patterns::catalog::{self, CalleeNames, ARGS, CALL, CLASS};
use crate::patterns::ShapeMatcher;

use super::arguments::ArgumentList;
use super::bindings::{text, ImportBindings};
use super::scope;
use super::types::{ArgsRef, Match, Warning, WarningKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Provider(Provider),
    Ambiguous,
}

/// Everything detection learned about one file.
#[derive(Debug, Clone)]
pub struct FileDetection {
    pub matches: Vec<Match>,
    pub warnings: Vec<Warning>,
    pub bindings: ImportBindings,
}

/// Detects constructor calls for a set of providers.
#[derive(Debug, Clone)]
pub struct Detector {
    providers: BTreeSet<Provider>,
}

impl Detector {
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new(Provider::ALL)
    }

    pub fn providers(&self) -> &BTreeSet<Provider> {
        &self.providers
    }

    pub fn detect(&self, file: &SourceFile, tree: &SyntaxTree) -> FileDetection {
        let source = file.text.as_bytes();
        let family = tree.family();
        let root = tree.root();
        let bindings = ImportBindings::collect(root, source, family);

        let mut matcher = ShapeMatcher::new();
        for &provider in &self.providers {
            let names = bindings.callee_names(provider);
            if !names.is_empty() {
                matcher.add(Tag::Provider(provider), catalog::constructor_shape(family, &names));
            }
        }

        let ambiguous = bindings.ambiguous_names();
        if !ambiguous.is_empty() {
            let locals: Vec<String> = ambiguous.iter().map(|(n, _)| n.clone()).collect();
            let names = CalleeNames {
                constructors: locals.clone(),
                namespaces: locals,
                classes: self
                    .providers
                    .iter()
                    .flat_map(|p| p.surface(family).classes.iter().map(|c| c.to_string()))
                    .collect(),
            };
            matcher.add(Tag::Ambiguous, catalog::constructor_shape(family, &names));
        }

        let mut matches = Vec::new();
        let mut warnings = Vec::new();
        for hit in matcher.find_all(root, source) {
            let Some(call) = hit.captures.get(CALL) else {
                continue;
            };
            let class_name = hit
                .captures
                .get(CLASS)
                .map(|n| text(n, source).to_string())
                .unwrap_or_default();
            let pos = call.start_position();
            let callee = callee_local(call, family)
                .map(|n| text(n, source))
                .unwrap_or_default();
            if !callee.is_empty() && scope::is_shadowed(call, callee, source, family) {
                tracing::debug!(path = %file.rel_path, line = pos.row + 1, %callee, "callee rebound in an enclosing scope");
                continue;
            }

            match hit.tag {
                Tag::Provider(provider) => {
                    let args = hit.captures.get(ARGS);
                    matches.push(Match {
                        path: file.rel_path.clone(),
                        provider,
                        language: file.language,
                        class_name,
                        call_range: call.byte_range(),
                        args: args.map(|a| ArgsRef {
                            range: a.byte_range(),
                            kind: a.kind(),
                        }),
                        line: pos.row + 1,
                        column: pos.column + 1,
                        already_proxied: args
                            .is_some_and(|a| proxy_key_present(a, source, family)),
                    });
                }
                Tag::Ambiguous => {
                    let reason = ambiguous
                        .iter()
                        .find(|(name, _)| *name == callee)
                        .map(|(_, reason)| reason.clone())
                        .unwrap_or_else(|| format!("`{callee}` cannot be resolved exactly"));
                    tracing::debug!(path = %file.rel_path, line = pos.row + 1, %reason, "ambiguous constructor");
                    warnings.push(Warning {
                        path: file.rel_path.clone(),
                        line: pos.row + 1,
                        column: pos.column + 1,
                        provider: None,
                        kind: WarningKind::PatternAmbiguous,
                        message: format!("skipped constructor call: {reason}"),
                    });
                }
            }
        }

        FileDetection {
            matches,
            warnings,
            bindings,
        }
    }
}

/// Whether a recognized base-URL key is among a constructor's arguments.
fn proxy_key_present(args: Node<'_>, source: &[u8], family: LanguageFamily) -> bool {
    let keys = recognized_proxy_keys(family);
    let list = match family {
        LanguageFamily::Ecma => {
            let mut cursor = args.walk();
            let first = args.named_children(&mut cursor).find(|c| !c.is_extra());
            match first {
                Some(obj) if obj.kind() == "object" => {
                    ArgumentList::parse(obj, source, family)
                }
                _ => None,
            }
        }
        LanguageFamily::Python => ArgumentList::parse(args, source, family),
    };
    list.is_some_and(|l| l.has_any(keys))
}

/// The leading identifier of a constructor callee (`X` or `ns` in `ns.X`).
fn callee_local(call: Node<'_>, family: LanguageFamily) -> Option<Node<'_>> {
    let field = match family {
        LanguageFamily::Ecma => "constructor",
        LanguageFamily::Python => "function",
    };
    let callee = call.child_by_field_name(field)?;
    match callee.kind() {
        "identifier" => Some(callee),
        _ => callee.child_by_field_name("object"),
    }
}
