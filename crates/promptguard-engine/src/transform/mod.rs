//! Transformer: turns detector matches into a minimal, disjoint edit plan.
//!
//! `Proxy` mode adds the base-URL entry and renames the credential lookup
//! to the proxied variable. `Unproxy` mode removes a base-URL entry holding
//! the configured proxy URL and renames the lookup back to the provider
//! default. Everything else in the file is left byte-identical.

pub mod ecma;
pub mod layout;
pub mod plan;
pub mod python;

use std::ops::Range;

use promptguard_core::errors::TransformError;
use promptguard_core::LanguageFamily;
use serde::Serialize;
use tree_sitter::Node;

use crate::detectors::bindings::{ecma_string_value, text};
use crate::detectors::{Entry, FileDetection, ImportBindings, Match, Warning, WarningKind};
use crate::parsers::{SourceFile, SyntaxTree};
use crate::patterns::catalog::{self, ENV_ARGS, ENV_NAME, ENV_STRING};
use crate::patterns::{Captures, ShapeMatcher};

pub use plan::{Edit, TransformPlan};

/// The proxy settings a plan is computed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub proxy_url: String,
    pub env_var_name: String,
    pub inject_missing_credential: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    Proxy,
    Unproxy,
}

/// Plan for one file plus the warnings raised computing it.
#[derive(Debug, Clone, Default)]
pub struct FilePlan {
    pub plan: TransformPlan,
    pub warnings: Vec<Warning>,
    /// Matches that contributed at least one edit.
    pub edited_matches: usize,
}

/// Edits for a single match.
#[derive(Debug, Default)]
pub(crate) struct MatchEdits {
    pub edits: Vec<Edit>,
    pub notes: Vec<String>,
    pub needs_os_import: bool,
}

/// Per-file inputs every match planner needs.
pub(crate) struct MatchContext<'a> {
    pub source: &'a str,
    pub root: Node<'a>,
    pub bindings: &'a ImportBindings,
    pub settings: &'a ProxySettings,
    pub family: LanguageFamily,
}

impl<'a> MatchContext<'a> {
    pub fn bytes(&self) -> &'a [u8] {
        self.source.as_bytes()
    }

    /// The node of `kind` spanning exactly `range`.
    pub fn node(&self, range: &Range<usize>, kind: &str) -> Result<Node<'a>, TransformError> {
        let mut node = self.root;
        'descend: loop {
            if node.byte_range() == *range && node.kind() == kind {
                return Ok(node);
            }
            let current = node;
            let mut cursor = current.walk();
            for child in current.children(&mut cursor) {
                if child.start_byte() <= range.start && range.end <= child.end_byte() {
                    node = child;
                    continue 'descend;
                }
            }
            return Err(TransformError::InvalidRange {
                start: range.start,
                end: range.end,
                len: self.source.len(),
            });
        }
    }
}

/// Compute the plan for one parsed file.
///
/// A match that cannot be edited unambiguously is skipped with a
/// `PatternAmbiguous` warning; the rest of the file is still planned.
pub fn plan_file(
    file: &SourceFile,
    tree: &SyntaxTree,
    detection: &FileDetection,
    settings: &ProxySettings,
    mode: PlanMode,
) -> FilePlan {
    let family = tree.family();
    let ctx = MatchContext {
        source: &file.text,
        root: tree.root(),
        bindings: &detection.bindings,
        settings,
        family,
    };

    let mut out = FilePlan::default();
    let mut accepted: Vec<Edit> = Vec::new();
    let mut needs_os_import = false;

    for m in &detection.matches {
        if mode == PlanMode::Proxy && m.already_proxied {
            continue;
        }
        let result = match (family, mode) {
            (LanguageFamily::Ecma, PlanMode::Proxy) => ecma::proxy_edits(&ctx, m),
            (LanguageFamily::Ecma, PlanMode::Unproxy) => ecma::unproxy_edits(&ctx, m),
            (LanguageFamily::Python, PlanMode::Proxy) => python::proxy_edits(&ctx, m),
            (LanguageFamily::Python, PlanMode::Unproxy) => python::unproxy_edits(&ctx, m),
        };

        let edits = match result {
            Ok(edits) => edits,
            Err(err) => {
                out.warnings.push(warning(m, WarningKind::PatternAmbiguous, err.to_string()));
                continue;
            }
        };

        if !edits.edits.is_empty() {
            let mut candidate = accepted.clone();
            candidate.extend(edits.edits.iter().cloned());
            if let Err(err) = TransformPlan::new(candidate) {
                out.warnings.push(warning(m, WarningKind::PatternAmbiguous, err.to_string()));
                continue;
            }
            accepted.extend(edits.edits);
            out.edited_matches += 1;
        }
        needs_os_import |= edits.needs_os_import;
        for note in edits.notes {
            out.warnings.push(warning(m, WarningKind::CredentialNotRewritten, note));
        }
    }

    if needs_os_import && !detection.bindings.os_is_imported() {
        accepted.push(python::import_os_edit(ctx.root, ctx.source));
    }

    let anchor = detection.matches.first().map_or((1, 1), |m| (m.line, m.column));
    seal(&file.rel_path, anchor, accepted, &mut out);
    out
}

/// Build the final plan. A conflicting set of edits leaves the file
/// untouched and is reported as a warning at `anchor` (line, column).
fn seal(path: &str, anchor: (usize, usize), accepted: Vec<Edit>, out: &mut FilePlan) {
    match TransformPlan::new(accepted) {
        Ok(plan) => out.plan = plan,
        Err(err) => {
            tracing::warn!(%path, error = %err, "discarding conflicting plan");
            out.warnings.push(Warning {
                path: path.to_string(),
                line: anchor.0,
                column: anchor.1,
                provider: None,
                kind: WarningKind::PatternAmbiguous,
                message: format!("file left unchanged: {err}"),
            });
            out.plan = TransformPlan::empty();
            out.edited_matches = 0;
        }
    }
}

fn warning(m: &Match, kind: WarningKind, message: String) -> Warning {
    Warning {
        path: m.path.clone(),
        line: m.line,
        column: m.column,
        provider: Some(m.provider),
        kind,
        message,
    }
}

/// One direct environment lookup: the variable name and the byte range
/// holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnvLookup {
    pub name: String,
    pub range: Range<usize>,
}

/// `node` as a direct environment lookup of one of `names`. Only grouping
/// parentheses and TS type assertions may wrap the lookup.
pub(crate) fn env_lookup(ctx: &MatchContext<'_>, node: Node<'_>, names: &[&str]) -> Option<EnvLookup> {
    let bytes = ctx.bytes();
    let node = strip_wrappers(node);
    let shapes = match ctx.family {
        LanguageFamily::Ecma => catalog::ecma_env_shapes(names),
        LanguageFamily::Python => catalog::python_env_shapes(&ctx.bindings.env_access_names()),
    };
    let mut matcher = ShapeMatcher::new();
    for shape in shapes {
        matcher.add((), shape);
    }

    matcher.match_at(node, bytes).into_iter().find_map(|hit| {
        lookup_from_captures(&hit.captures, bytes, ctx.family)
            .filter(|l| names.contains(&l.name.as_str()))
    })
}

/// The variable an env-lookup shape hit reads, when it is a literal name.
pub(crate) fn lookup_from_captures(
    captures: &Captures<'_>,
    source: &[u8],
    family: LanguageFamily,
) -> Option<EnvLookup> {
    if let Some(name) = captures.get(ENV_NAME) {
        Some(EnvLookup {
            name: text(name, source).to_string(),
            range: name.byte_range(),
        })
    } else if let Some(string) = captures.get(ENV_STRING) {
        string_key(string, source, family)
    } else if let Some(args) = captures.get(ENV_ARGS) {
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).find(|c| !c.is_extra());
        first.and_then(|f| string_key(f, source, family))
    } else {
        None
    }
}

fn strip_wrappers(mut node: Node<'_>) -> Node<'_> {
    while matches!(
        node.kind(),
        "parenthesized_expression" | "non_null_expression" | "as_expression" | "satisfies_expression"
    ) {
        let mut cursor = node.walk();
        let inner = node.named_children(&mut cursor).find(|c| !c.is_extra());
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// The content of a plain string literal used as an environment key.
fn string_key(node: Node<'_>, source: &[u8], family: LanguageFamily) -> Option<EnvLookup> {
    match family {
        LanguageFamily::Ecma => {
            let value = ecma_string_value(node, source)?;
            let mut cursor = node.walk();
            let fragment = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "string_fragment")?;
            Some(EnvLookup {
                name: value,
                range: fragment.byte_range(),
            })
        }
        LanguageFamily::Python => {
            let content = python::plain_string_content(node, source)?;
            Some(EnvLookup {
                name: text(content, source).to_string(),
                range: content.byte_range(),
            })
        }
    }
}

/// Rename the credential entry's lookup from any of `from` to `to`. Leaves
/// a note when the value is not a direct lookup of one of those names.
pub(crate) fn rename_credential(
    ctx: &MatchContext<'_>,
    entry: &Entry<'_>,
    key: &str,
    from: &[&str],
    to: &str,
    out: &mut MatchEdits,
) {
    let mut names: Vec<&str> = from.to_vec();
    names.push(to);
    match entry.value().and_then(|value| env_lookup(ctx, value, &names)) {
        Some(lookup) if lookup.name == to => {}
        Some(lookup) => out.edits.push(Edit::replace(lookup.range, to)),
        None => out.notes.push(format!(
            "`{key}` is not a direct environment lookup of {}; left unchanged",
            from.join(" or ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_final_plan_is_reported() {
        let mut out = FilePlan {
            edited_matches: 1,
            ..FilePlan::default()
        };
        let edits = vec![Edit::replace(0..5, "a"), Edit::insert(2, "import os\n")];
        seal("app.py", (3, 1), edits, &mut out);

        assert!(out.plan.is_empty());
        assert_eq!(out.edited_matches, 0);
        assert_eq!(out.warnings.len(), 1);
        let w = &out.warnings[0];
        assert_eq!(w.kind, WarningKind::PatternAmbiguous);
        assert_eq!((w.path.as_str(), w.line), ("app.py", 3));
        assert!(w.message.starts_with("file left unchanged"));
    }

    #[test]
    fn disjoint_final_plan_is_kept() {
        let mut out = FilePlan::default();
        seal("app.py", (1, 1), vec![Edit::insert(0, "import os\n")], &mut out);
        assert_eq!(out.plan.edits().len(), 1);
        assert!(out.warnings.is_empty());
    }
}
