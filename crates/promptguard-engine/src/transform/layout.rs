//! Formatting-preserving insertion and removal inside argument lists.

use std::ops::Range;

use promptguard_core::LanguageFamily;
use tree_sitter::Node;

use crate::detectors::ArgumentList;

use super::plan::Edit;

/// Quote character to use for new string literals: whatever the first
/// string literal under `scope` uses, else `"`.
pub fn quote_style(scope: Node<'_>, source: &str) -> char {
    let mut found = None;
    crate::detectors::bindings::for_each_node(scope, |node| {
        if found.is_some() || node.kind() != "string" {
            return;
        }
        let text = source.get(node.byte_range()).unwrap_or("");
        found = text
            .chars()
            .find(|c| matches!(c, '"' | '\''))
            .or(Some('"'));
    });
    found.unwrap_or('"')
}

/// A string literal. Callers only pass values validated to contain no
/// quotes or backslashes.
pub fn string_literal(value: &str, quote: char) -> String {
    format!("{quote}{value}{quote}")
}

/// A `key: value` (TS/JS) or `key=value` (Python) entry.
pub fn entry(family: LanguageFamily, key: &str, value: &str) -> String {
    match family {
        LanguageFamily::Ecma => format!("{key}: {value}"),
        LanguageFamily::Python => format!("{key}={value}"),
    }
}

/// One insertion that appends `new_entries` after the last entry of `list`,
/// following its comma and line conventions.
pub fn append_entries(list: &ArgumentList<'_>, new_entries: &[String], source: &str, family: LanguageFamily) -> Edit {
    let Some(last) = list.entries.last() else {
        return fill_empty(list, new_entries, source, family);
    };

    if list.is_multiline(source) {
        let indent = line_indent(source, last.node.start_byte());
        match list.trailing_comma_end {
            Some(comma_end) => Edit::insert(
                comma_end,
                new_entries
                    .iter()
                    .map(|e| format!("\n{indent}{e},"))
                    .collect::<String>(),
            ),
            None => Edit::insert(
                last.node.end_byte(),
                new_entries
                    .iter()
                    .map(|e| format!(",\n{indent}{e}"))
                    .collect::<String>(),
            ),
        }
    } else {
        match list.trailing_comma_end {
            Some(comma_end) => Edit::insert(
                comma_end,
                new_entries.iter().map(|e| format!(" {e},")).collect::<String>(),
            ),
            None => Edit::insert(
                last.node.end_byte(),
                new_entries.iter().map(|e| format!(", {e}")).collect::<String>(),
            ),
        }
    }
}

/// `{}` becomes `{ a, b }`; `()` becomes `(a, b)`. Comments inside the
/// delimiters are kept by inserting before the closing delimiter.
fn fill_empty(list: &ArgumentList<'_>, new_entries: &[String], source: &str, family: LanguageFamily) -> Edit {
    let joined = new_entries.join(", ");
    let inner = list.open_end..list.close_start;
    let blank = source.get(inner.clone()).is_some_and(|s| s.trim().is_empty());
    let text = match family {
        LanguageFamily::Ecma => format!(" {joined} "),
        LanguageFamily::Python => joined,
    };
    if blank && !source[inner.clone()].contains('\n') {
        Edit::replace(inner, text)
    } else {
        Edit::insert(list.close_start, format!("{} ", text.trim_end()))
    }
}

/// Byte range removing entry `idx` together with one separating comma.
pub fn removal_range(list: &ArgumentList<'_>, idx: usize) -> Range<usize> {
    let entries = &list.entries;
    if idx > 0 {
        entries[idx - 1].node.end_byte()..entries[idx].node.end_byte()
    } else if entries.len() > 1 {
        entries[0].node.start_byte()..entries[1].node.start_byte()
    } else {
        list.open_end..list.close_start
    }
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &source[line_start..];
    let width = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..width]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_of_nested_line() {
        let src = "x({\n    a: 1,\n    b: 2\n})";
        let b = src.find("b: 2").unwrap();
        assert_eq!(line_indent(src, b), "    ");
        assert_eq!(line_indent(src, 0), "");
    }

    #[test]
    fn entries_per_family() {
        assert_eq!(entry(LanguageFamily::Ecma, "baseURL", "\"u\""), "baseURL: \"u\"");
        assert_eq!(entry(LanguageFamily::Python, "base_url", "'u'"), "base_url='u'");
    }
}
