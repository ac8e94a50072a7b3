//! Python planning: keyword arguments of `Client(...)` and the `os` import.

use promptguard_core::errors::TransformError;
use promptguard_core::types::recognized_proxy_keys;
use promptguard_core::LanguageFamily;
use tree_sitter::Node;

use crate::detectors::bindings::text;
use crate::detectors::{ArgumentList, EntryKey, Match};

use super::layout::{self, entry, string_literal};
use super::plan::Edit;
use super::{rename_credential, MatchContext, MatchEdits};

const FAMILY: LanguageFamily = LanguageFamily::Python;

pub(crate) fn proxy_edits(ctx: &MatchContext<'_>, m: &Match) -> Result<MatchEdits, TransformError> {
    let list = argument_list(ctx, m)?;
    if list.has_any(recognized_proxy_keys(FAMILY)) {
        return Ok(MatchEdits::default());
    }
    if let Some(reason) = list.opaque_reason(FAMILY) {
        return Err(TransformError::ambiguous(reason));
    }

    let surface = m.provider.surface(FAMILY);
    let settings = ctx.settings;
    let quote = layout::quote_style(list.container, ctx.source);
    let mut out = MatchEdits::default();
    let mut entries = Vec::new();

    match list.find(&[surface.credential_key]) {
        Some(existing) => rename_credential(
            ctx,
            existing,
            surface.credential_key,
            m.provider.default_env_vars(),
            &settings.env_var_name,
            &mut out,
        ),
        None if settings.inject_missing_credential => {
            let key = string_literal(&settings.env_var_name, quote);
            let (lookup, needs_import) = env_lookup_expression(ctx, &key)?;
            entries.push(entry(FAMILY, surface.credential_key, &lookup));
            out.needs_os_import = needs_import;
        }
        None => {}
    }
    entries.push(entry(
        FAMILY,
        surface.proxy_key,
        &string_literal(&settings.proxy_url, quote),
    ));
    out.edits
        .push(layout::append_entries(&list, &entries, ctx.source, FAMILY));
    Ok(out)
}

pub(crate) fn unproxy_edits(ctx: &MatchContext<'_>, m: &Match) -> Result<MatchEdits, TransformError> {
    let mut out = MatchEdits::default();
    let list = match argument_list(ctx, m) {
        Ok(list) => list,
        Err(_) => return Ok(out),
    };
    let bytes = ctx.bytes();
    let keys = recognized_proxy_keys(FAMILY);
    let proxy_idx = list.entries.iter().position(|e| {
        matches!(&e.key, EntryKey::Static(k) if keys.contains(&k.as_str()))
            && e.value()
                .and_then(|v| plain_string_content(v, bytes))
                .is_some_and(|c| text(c, bytes) == ctx.settings.proxy_url)
    });

    let surface = m.provider.surface(FAMILY);
    if let Some(existing) = list.find(&[surface.credential_key]) {
        rename_credential(
            ctx,
            existing,
            surface.credential_key,
            &[ctx.settings.env_var_name.as_str()],
            m.provider.primary_env_var(),
            &mut out,
        );
        out.notes.clear();
    }
    if let Some(idx) = proxy_idx {
        out.edits.push(Edit::delete(layout::removal_range(&list, idx)));
    }
    Ok(out)
}

fn argument_list<'a>(ctx: &MatchContext<'a>, m: &Match) -> Result<ArgumentList<'a>, TransformError> {
    let args_ref = m
        .args
        .as_ref()
        .ok_or_else(|| TransformError::ambiguous("call has no argument list"))?;
    if args_ref.kind != "argument_list" {
        return Err(TransformError::ambiguous(
            "client is constructed from a generator expression",
        ));
    }
    let args = ctx.node(&args_ref.range, "argument_list")?;
    ArgumentList::parse(args, ctx.bytes(), FAMILY)
        .ok_or_else(|| TransformError::ambiguous("argument list could not be read"))
}

/// An expression reading `key` from the environment through whatever the
/// file already binds. The flag is set when `import os` must be added.
fn env_lookup_expression(ctx: &MatchContext<'_>, key: &str) -> Result<(String, bool), TransformError> {
    let bindings = ctx.bindings;
    let names = bindings.module_env_access_names();
    if let Some(environ) = names.environ.first() {
        return Ok((format!("{environ}.get({key})"), false));
    }
    if bindings.os_is_imported() {
        if let Some(os) = names.os.first() {
            return Ok((format!("{os}.environ.get({key})"), false));
        }
    }
    if let Some(getenv) = names.getenv.first() {
        return Ok((format!("{getenv}({key})"), false));
    }
    if bindings.os_is_rebound() {
        return Err(TransformError::ambiguous(
            "`os` is bound to something other than the os module; cannot add a credential lookup",
        ));
    }
    Ok((format!("os.environ.get({key})"), true))
}

/// `import os` on its own line before the first statement that is neither
/// the module docstring nor a `__future__` import.
pub(crate) fn import_os_edit(root: Node<'_>, source: &str) -> Edit {
    let mut cursor = root.walk();
    let mut first = true;
    let mut anchor = None;
    for child in root.named_children(&mut cursor) {
        if child.is_extra() {
            continue;
        }
        let docstring = first && is_docstring(child);
        first = false;
        if docstring || child.kind() == "future_import_statement" {
            continue;
        }
        anchor = Some(child.start_byte());
        break;
    }

    match anchor {
        Some(start) => {
            let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
            Edit::insert(line_start, "import os\n")
        }
        None if source.is_empty() || source.ends_with('\n') => {
            Edit::insert(source.len(), "import os\n")
        }
        None => Edit::insert(source.len(), "\nimport os\n"),
    }
}

fn is_docstring(node: Node<'_>) -> bool {
    if node.kind() != "expression_statement" {
        return false;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    matches!(children.as_slice(), [only] if only.kind() == "string")
}

/// The `string_content` node of a plain literal: no f/b prefix, no
/// interpolation, and no implicit concatenation.
pub(crate) fn plain_string_content<'t>(node: Node<'t>, source: &[u8]) -> Option<Node<'t>> {
    if node.kind() != "string" {
        return None;
    }
    let mut cursor = node.walk();
    let mut content = None;
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_start" => {
                let prefix = text(child, source).trim_end_matches(['"', '\'']);
                if prefix
                    .chars()
                    .any(|c| matches!(c.to_ascii_lowercase(), 'f' | 'b' | 't'))
                {
                    return None;
                }
            }
            "string_content" if content.is_none() => content = Some(child),
            "string_end" => {}
            _ => return None,
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::AstProvider;
    use std::path::Path;

    fn parse(src: &str) -> crate::parsers::SyntaxTree {
        AstProvider::Python.parse(src, Path::new("t.py")).unwrap()
    }

    #[test]
    fn import_goes_after_docstring_and_future_imports() {
        let src = "\"\"\"Docs.\"\"\"\nfrom __future__ import annotations\n\nclient = make()\n";
        let tree = parse(src);
        let edit = import_os_edit(tree.root(), src);
        assert_eq!(edit.range.start, src.find("client").unwrap());
        assert_eq!(edit.text, "import os\n");
    }

    #[test]
    fn import_goes_first_without_docstring() {
        let src = "# comment\nx = 1\n";
        let tree = parse(src);
        let edit = import_os_edit(tree.root(), src);
        assert_eq!(edit.range.start, src.find("x = 1").unwrap());
    }

    #[test]
    fn f_strings_are_not_plain() {
        let src = "a = f\"X{y}\"\nb = \"KEY\"\n";
        let tree = parse(src);
        let mut strings = Vec::new();
        crate::detectors::bindings::for_each_node(tree.root(), |n| {
            if n.kind() == "string" {
                strings.push(n);
            }
        });
        assert_eq!(strings.len(), 2);
        assert!(plain_string_content(strings[0], src.as_bytes()).is_none());
        let content = plain_string_content(strings[1], src.as_bytes()).unwrap();
        assert_eq!(text(content, src.as_bytes()), "KEY");
    }
}
