//! TS/JS planning: entries in the options object of `new Client(...)`.

use promptguard_core::errors::TransformError;
use promptguard_core::types::recognized_proxy_keys;
use promptguard_core::LanguageFamily;
use tree_sitter::Node;

use crate::detectors::bindings::ecma_string_value;
use crate::detectors::{ArgumentList, EntryKey, Match};

use super::layout::{self, entry, string_literal};
use super::plan::Edit;
use super::{rename_credential, MatchContext, MatchEdits};

const FAMILY: LanguageFamily = LanguageFamily::Ecma;

pub(crate) fn proxy_edits(ctx: &MatchContext<'_>, m: &Match) -> Result<MatchEdits, TransformError> {
    let surface = m.provider.surface(FAMILY);
    let call = ctx.node(&m.call_range, "new_expression")?;
    let quote = layout::quote_style(call, ctx.source);
    let settings = ctx.settings;
    let mut out = MatchEdits::default();

    let mut entries = Vec::new();
    let credential_entry = entry(
        FAMILY,
        surface.credential_key,
        &format!("process.env.{}", settings.env_var_name),
    );
    let proxy_entry = entry(FAMILY, surface.proxy_key, &string_literal(&settings.proxy_url, quote));

    let Some(args_ref) = &m.args else {
        // `new OpenAI` without parentheses.
        if settings.inject_missing_credential {
            entries.push(credential_entry);
        }
        entries.push(proxy_entry);
        out.edits.push(Edit::insert(
            call.end_byte(),
            format!("({{ {} }})", entries.join(", ")),
        ));
        return Ok(out);
    };

    let args = ctx.node(&args_ref.range, "arguments")?;
    match first_argument(args) {
        None => {
            if settings.inject_missing_credential {
                entries.push(credential_entry);
            }
            entries.push(proxy_entry);
            let list = ArgumentList::parse(args, ctx.bytes(), FAMILY)
                .ok_or_else(|| TransformError::ambiguous("argument list could not be read"))?;
            let object = format!("{{ {} }}", entries.join(", "));
            let inner = list.open_end..list.close_start;
            if ctx.source[inner.clone()].trim().is_empty() {
                out.edits.push(Edit::replace(inner, object));
            } else {
                out.edits.push(Edit::insert(list.close_start, object));
            }
        }
        Some(object) if object.kind() == "object" => {
            let list = ArgumentList::parse(object, ctx.bytes(), FAMILY)
                .ok_or_else(|| TransformError::ambiguous("options object could not be read"))?;
            if list.has_any(recognized_proxy_keys(FAMILY)) {
                return Ok(out);
            }
            if let Some(reason) = list.opaque_reason(FAMILY) {
                return Err(TransformError::ambiguous(reason));
            }
            match list.find(&[surface.credential_key]) {
                Some(existing) => rename_credential(
                    ctx,
                    existing,
                    surface.credential_key,
                    m.provider.default_env_vars(),
                    &settings.env_var_name,
                    &mut out,
                ),
                None if settings.inject_missing_credential => entries.push(credential_entry),
                None => {}
            }
            entries.push(proxy_entry);
            out.edits
                .push(layout::append_entries(&list, &entries, ctx.source, FAMILY));
        }
        Some(other) => {
            return Err(TransformError::ambiguous(format!(
                "options are passed as {} rather than an object literal",
                describe(other.kind())
            )));
        }
    }
    Ok(out)
}

pub(crate) fn unproxy_edits(ctx: &MatchContext<'_>, m: &Match) -> Result<MatchEdits, TransformError> {
    let mut out = MatchEdits::default();
    let Some(args_ref) = &m.args else {
        return Ok(out);
    };
    let args = ctx.node(&args_ref.range, "arguments")?;
    let Some(object) = first_argument(args).filter(|o| o.kind() == "object") else {
        return Ok(out);
    };
    let list = ArgumentList::parse(object, ctx.bytes(), FAMILY)
        .ok_or_else(|| TransformError::ambiguous("options object could not be read"))?;

    let surface = m.provider.surface(FAMILY);
    let proxy_idx = proxy_entry_index(&list, ctx.bytes(), &ctx.settings.proxy_url);

    if let Some(existing) = list.find(&[surface.credential_key]) {
        rename_credential(
            ctx,
            existing,
            surface.credential_key,
            &[ctx.settings.env_var_name.as_str()],
            m.provider.primary_env_var(),
            &mut out,
        );
        // A credential that never read the proxied variable is left alone silently.
        out.notes.clear();
    }
    if let Some(idx) = proxy_idx {
        out.edits.push(Edit::delete(layout::removal_range(&list, idx)));
    }
    Ok(out)
}

/// Index of a base-URL entry whose value is exactly `proxy_url`.
fn proxy_entry_index(list: &ArgumentList<'_>, source: &[u8], proxy_url: &str) -> Option<usize> {
    let keys = recognized_proxy_keys(FAMILY);
    list.entries.iter().position(|e| {
        matches!(&e.key, EntryKey::Static(k) if keys.contains(&k.as_str()))
            && e.value()
                .and_then(|v| ecma_string_value(v, source))
                .is_some_and(|url| url == proxy_url)
    })
}

fn first_argument(args: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = args.walk();
    let first = args.named_children(&mut cursor).find(|c| !c.is_extra());
    first
}

fn describe(kind: &str) -> String {
    match kind {
        "identifier" => "a variable".to_string(),
        "call_expression" => "a call result".to_string(),
        "spread_element" => "a spread".to_string(),
        other => format!("`{other}`"),
    }
}
