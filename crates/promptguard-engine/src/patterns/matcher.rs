//! Single-pass, kind-indexed shape matcher.

use promptguard_core::FxHashMap;
use smallvec::SmallVec;
use tree_sitter::Node;

use super::shape::{Captures, Shape};

/// One hit: the tag of the shape that matched, the node it matched at,
/// and its captures.
#[derive(Debug, Clone)]
pub struct ShapeMatch<'t, T> {
    pub tag: T,
    pub node: Node<'t>,
    pub captures: Captures<'t>,
}

/// A set of tagged shapes run together over a tree.
pub struct ShapeMatcher<T> {
    shapes: Vec<(T, Shape)>,
    by_kind: FxHashMap<&'static str, SmallVec<[usize; 4]>>,
    any_kind: Vec<usize>,
}

impl<T: Copy> Default for ShapeMatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> ShapeMatcher<T> {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            by_kind: FxHashMap::default(),
            any_kind: Vec::new(),
        }
    }

    pub fn add(&mut self, tag: T, shape: Shape) {
        let idx = self.shapes.len();
        match shape.root_kinds() {
            Some(kinds) => {
                for kind in kinds {
                    self.by_kind.entry(kind).or_default().push(idx);
                }
            }
            None => self.any_kind.push(idx),
        }
        self.shapes.push((tag, shape));
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// All matches in the tree, in document (pre-)order. A node matched by
    /// several shapes yields one hit per shape, in registration order.
    pub fn find_all<'t>(&self, root: Node<'t>, source: &[u8]) -> Vec<ShapeMatch<'t, T>> {
        let mut out = Vec::new();
        if self.shapes.is_empty() {
            return out;
        }

        let mut cursor = root.walk();
        loop {
            let node = cursor.node();
            self.visit(node, source, &mut out);

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return out;
                }
            }
        }
    }

    /// Matches rooted at `node` itself, without descending.
    pub fn match_at<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<ShapeMatch<'t, T>> {
        let mut out = Vec::new();
        self.visit(node, source, &mut out);
        out
    }

    fn visit<'t>(&self, node: Node<'t>, source: &[u8], out: &mut Vec<ShapeMatch<'t, T>>) {
        let indexed = self.by_kind.get(node.kind()).map(|v| v.as_slice()).unwrap_or(&[]);
        let mut candidates: SmallVec<[usize; 8]> = indexed.iter().copied().collect();
        candidates.extend(self.any_kind.iter().copied());
        candidates.sort_unstable();

        for idx in candidates {
            let (tag, shape) = &self.shapes[idx];
            let mut captures = Captures::default();
            if shape.matches(node, source, &mut captures) {
                out.push(ShapeMatch {
                    tag: *tag,
                    node,
                    captures,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::AstProvider;
    use promptguard_core::Language;
    use std::path::Path;

    #[test]
    fn finds_nested_calls_in_document_order() {
        let src = "f(g(1)); h();\n";
        let tree = AstProvider::for_language(Language::JavaScript)
            .parse(src, Path::new("t.js"))
            .unwrap();
        let mut matcher = ShapeMatcher::new();
        matcher.add(
            0u8,
            Shape::node("call_expression")
                .field("function", Shape::node("identifier").capture("callee"))
                .into(),
        );
        let hits = matcher.find_all(tree.root(), src.as_bytes());
        let names: Vec<_> = hits
            .iter()
            .map(|h| h.captures.get("callee").unwrap().utf8_text(src.as_bytes()).unwrap())
            .collect();
        assert_eq!(names, vec!["f", "g", "h"]);
    }

    #[test]
    fn match_at_does_not_descend() {
        let src = "f(g(1));\n";
        let tree = AstProvider::for_language(Language::JavaScript)
            .parse(src, Path::new("t.js"))
            .unwrap();
        let mut matcher = ShapeMatcher::new();
        matcher.add(
            0u8,
            Shape::node("call_expression")
                .field("function", Shape::node("identifier").text_in(["g"]))
                .into(),
        );
        let root = tree.root();
        let outer = root.named_child(0).unwrap().named_child(0).unwrap();
        assert_eq!(outer.kind(), "call_expression");
        assert!(matcher.match_at(outer, src.as_bytes()).is_empty());
        assert_eq!(matcher.find_all(outer, src.as_bytes()).len(), 1);
    }

    #[test]
    fn text_constraint_filters_and_failed_alternatives_drop_captures() {
        let src = "a.b(); c();\n";
        let tree = AstProvider::for_language(Language::JavaScript)
            .parse(src, Path::new("t.js"))
            .unwrap();
        let mut matcher = ShapeMatcher::new();
        matcher.add(
            1u8,
            Shape::node("call_expression")
                .field(
                    "function",
                    Shape::one_of(vec![
                        Shape::node("member_expression")
                            .field("object", Shape::node("identifier").capture("obj"))
                            .field("property", Shape::node("property_identifier").text_in(["zzz"]))
                            .into(),
                        Shape::node("identifier").text_in(["c"]).capture("callee"),
                    ]),
                )
                .into(),
        );
        let hits = matcher.find_all(tree.root(), src.as_bytes());
        assert_eq!(hits.len(), 1);
        assert!(hits[0].captures.get("obj").is_none());
        assert!(hits[0].captures.get("callee").is_some());
    }
}
