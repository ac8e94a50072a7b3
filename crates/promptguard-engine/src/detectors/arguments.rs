//! Argument-list analysis shared by the detector and the transformer.
//!
//! Covers TS/JS option objects (`{ ... }`) and Python call argument lists
//! (`( ... )`): their entries, keys, delimiters, and trailing comma.

use promptguard_core::LanguageFamily;
use tree_sitter::Node;

use super::bindings::{ecma_string_value, text};

/// How an entry's key is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    /// A key spelled out in source.
    Static(String),
    /// A computed key whose value is not a literal.
    Dynamic,
    /// `...spread` or `**kwargs`.
    Spread,
    /// A positional argument or `*args`.
    Positional,
}

#[derive(Debug, Clone)]
pub struct Entry<'t> {
    pub node: Node<'t>,
    pub key: EntryKey,
}

impl<'t> Entry<'t> {
    /// The entry's value node (`pair.value`, `keyword_argument.value`).
    pub fn value(&self) -> Option<Node<'t>> {
        self.node.child_by_field_name("value")
    }
}

/// Entries and delimiters of an object literal or a Python argument list.
#[derive(Debug, Clone)]
pub struct ArgumentList<'t> {
    pub container: Node<'t>,
    /// Byte just after the opening `{` or `(`.
    pub open_end: usize,
    /// Byte of the closing `}` or `)`.
    pub close_start: usize,
    pub entries: Vec<Entry<'t>>,
    /// End byte of a comma after the last entry.
    pub trailing_comma_end: Option<usize>,
}

impl<'t> ArgumentList<'t> {
    /// Analyze an `object` (TS/JS) or `argument_list` (Python) node.
    pub fn parse(container: Node<'t>, source: &[u8], family: LanguageFamily) -> Option<Self> {
        let (open, close) = match (family, container.kind()) {
            (LanguageFamily::Ecma, "object") => ("{", "}"),
            (LanguageFamily::Ecma, "arguments") | (LanguageFamily::Python, "argument_list") => {
                ("(", ")")
            }
            _ => return None,
        };

        let mut cursor = container.walk();
        let children: Vec<Node<'t>> = container.children(&mut cursor).collect();
        let open_end = children.iter().find(|c| c.kind() == open)?.end_byte();
        let close_start = children.iter().rev().find(|c| c.kind() == close)?.start_byte();

        let mut entries = Vec::new();
        let mut trailing_comma_end = None;
        for child in &children {
            if child.is_extra() {
                continue;
            }
            if child.is_named() {
                entries.push(Entry {
                    node: *child,
                    key: entry_key(*child, source, family),
                });
                trailing_comma_end = None;
            } else if child.kind() == "," && !entries.is_empty() {
                trailing_comma_end = Some(child.end_byte());
            }
        }

        Some(Self {
            container,
            open_end,
            close_start,
            entries,
            trailing_comma_end,
        })
    }

    pub fn find(&self, keys: &[&str]) -> Option<&Entry<'t>> {
        self.entries
            .iter()
            .find(|e| matches!(&e.key, EntryKey::Static(k) if keys.contains(&k.as_str())))
    }

    pub fn position(&self, keys: &[&str]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| matches!(&e.key, EntryKey::Static(k) if keys.contains(&k.as_str())))
    }

    pub fn has_any(&self, keys: &[&str]) -> bool {
        self.find(keys).is_some()
    }

    /// Why a missing key cannot be ruled out, if it cannot.
    pub fn opaque_reason(&self, family: LanguageFamily) -> Option<&'static str> {
        self.entries.iter().find_map(|e| match (&e.key, family) {
            (EntryKey::Spread, LanguageFamily::Ecma) => {
                Some("options object contains a spread that may already set the base URL")
            }
            (EntryKey::Spread, LanguageFamily::Python) => {
                Some("call unpacks **kwargs that may already set base_url")
            }
            (EntryKey::Dynamic, _) => {
                Some("options object has a computed key that may alias the base URL key")
            }
            _ => None,
        })
    }

    /// Whether the list spans lines between its opening delimiter and first entry.
    pub fn is_multiline(&self, source: &str) -> bool {
        match self.entries.first() {
            Some(first) => source
                .get(self.open_end..first.node.start_byte())
                .is_some_and(|s| s.contains('\n')),
            None => false,
        }
    }
}

fn entry_key(node: Node<'_>, source: &[u8], family: LanguageFamily) -> EntryKey {
    match (family, node.kind()) {
        (LanguageFamily::Ecma, "pair") => match node.child_by_field_name("key") {
            Some(key) => ecma_key(key, source),
            None => EntryKey::Dynamic,
        },
        (LanguageFamily::Ecma, "shorthand_property_identifier") => {
            EntryKey::Static(text(node, source).to_string())
        }
        (LanguageFamily::Ecma, "method_definition") => match node.child_by_field_name("name") {
            Some(name) => ecma_key(name, source),
            None => EntryKey::Dynamic,
        },
        (LanguageFamily::Ecma, "spread_element") => EntryKey::Spread,
        (LanguageFamily::Ecma, _) => EntryKey::Dynamic,
        (LanguageFamily::Python, "keyword_argument") => match node.child_by_field_name("name") {
            Some(name) => EntryKey::Static(text(name, source).to_string()),
            None => EntryKey::Dynamic,
        },
        (LanguageFamily::Python, "dictionary_splat") => EntryKey::Spread,
        (LanguageFamily::Python, _) => EntryKey::Positional,
    }
}

fn ecma_key(key: Node<'_>, source: &[u8]) -> EntryKey {
    match key.kind() {
        "property_identifier" | "private_property_identifier" | "number" => {
            EntryKey::Static(text(key, source).to_string())
        }
        "string" => ecma_string_value(key, source)
            .map(EntryKey::Static)
            .unwrap_or(EntryKey::Dynamic),
        "computed_property_name" => {
            let mut cursor = key.walk();
            let inner: Vec<Node<'_>> = key.named_children(&mut cursor).collect();
            match inner.as_slice() {
                [only] => ecma_string_value(*only, source)
                    .map(EntryKey::Static)
                    .unwrap_or(EntryKey::Dynamic),
                _ => EntryKey::Dynamic,
            }
        }
        _ => EntryKey::Dynamic,
    }
}
