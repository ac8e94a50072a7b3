//! Shape definitions and the recursive matching routine.

use promptguard_core::FxHashSet;
use smallvec::SmallVec;
use tree_sitter::Node;

/// A structural constraint on a node.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Matches any node.
    Any,
    Node(NodeShape),
    /// First alternative that matches wins.
    OneOf(Vec<Shape>),
    /// Records the matched node under a name.
    Capture(&'static str, Box<Shape>),
}

/// Kind, text, and field constraints on one node.
#[derive(Debug, Clone, Default)]
pub struct NodeShape {
    kinds: SmallVec<[&'static str; 2]>,
    text: Option<FxHashSet<String>>,
    fields: Vec<FieldShape>,
}

#[derive(Debug, Clone)]
pub struct FieldShape {
    pub name: &'static str,
    pub shape: Shape,
    /// An absent optional field matches; a present one must satisfy `shape`.
    pub optional: bool,
}

/// Named captures of one match, in capture order.
#[derive(Debug, Clone, Default)]
pub struct Captures<'t> {
    items: SmallVec<[(&'static str, Node<'t>); 4]>,
}

impl<'t> Captures<'t> {
    pub fn get(&self, name: &str) -> Option<Node<'t>> {
        self.items
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, node)| *node)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, name: &'static str, node: Node<'t>) {
        self.items.push((name, node));
    }

    fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

impl Shape {
    pub fn any() -> Self {
        Self::Any
    }

    /// Start a node shape of the given kind.
    pub fn node(kind: &'static str) -> NodeShape {
        NodeShape {
            kinds: SmallVec::from_slice(&[kind]),
            ..NodeShape::default()
        }
    }

    pub fn one_of(alternatives: Vec<Shape>) -> Self {
        Self::OneOf(alternatives)
    }

    pub fn capture(self, name: &'static str) -> Self {
        Self::Capture(name, Box::new(self))
    }

    /// Node kinds this shape can match at its root; `None` means any kind.
    pub fn root_kinds(&self) -> Option<Vec<&'static str>> {
        match self {
            Self::Any => None,
            Self::Node(n) if n.kinds.is_empty() => None,
            Self::Node(n) => Some(n.kinds.to_vec()),
            Self::Capture(_, inner) => inner.root_kinds(),
            Self::OneOf(alts) => {
                let mut kinds = Vec::new();
                for alt in alts {
                    kinds.extend(alt.root_kinds()?);
                }
                kinds.sort_unstable();
                kinds.dedup();
                Some(kinds)
            }
        }
    }

    /// Test `node` against this shape, appending captures on success.
    /// On failure `captures` is left as it was.
    pub fn matches<'t>(&self, node: Node<'t>, source: &[u8], captures: &mut Captures<'t>) -> bool {
        match self {
            Self::Any => true,
            Self::Capture(name, inner) => {
                if inner.matches(node, source, captures) {
                    captures.push(*name, node);
                    true
                } else {
                    false
                }
            }
            Self::OneOf(alternatives) => alternatives.iter().any(|alt| {
                let mark = captures.len();
                let ok = alt.matches(node, source, captures);
                if !ok {
                    captures.truncate(mark);
                }
                ok
            }),
            Self::Node(shape) => shape.matches(node, source, captures),
        }
    }
}

impl NodeShape {
    pub fn field(mut self, name: &'static str, shape: impl Into<Shape>) -> Self {
        self.fields.push(FieldShape {
            name,
            shape: shape.into(),
            optional: false,
        });
        self
    }

    pub fn optional_field(mut self, name: &'static str, shape: impl Into<Shape>) -> Self {
        self.fields.push(FieldShape {
            name,
            shape: shape.into(),
            optional: true,
        });
        self
    }

    /// Require the node's source text to be one of `texts`.
    /// An empty set matches nothing.
    pub fn text_in<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text = Some(texts.into_iter().map(Into::into).collect());
        self
    }

    pub fn capture(self, name: &'static str) -> Shape {
        Shape::from(self).capture(name)
    }

    fn matches<'t>(&self, node: Node<'t>, source: &[u8], captures: &mut Captures<'t>) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&node.kind()) {
            return false;
        }
        if let Some(texts) = &self.text {
            match node.utf8_text(source) {
                Ok(text) if texts.contains(text) => {}
                _ => return false,
            }
        }

        let mark = captures.len();
        for field in &self.fields {
            let ok = match node.child_by_field_name(field.name) {
                Some(child) => field.shape.matches(child, source, captures),
                None => field.optional,
            };
            if !ok {
                captures.truncate(mark);
                return false;
            }
        }
        true
    }
}

impl From<NodeShape> for Shape {
    fn from(shape: NodeShape) -> Self {
        Shape::Node(shape)
    }
}
