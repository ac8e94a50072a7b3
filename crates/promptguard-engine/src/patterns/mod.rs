//! Declarative structural patterns over tree-sitter trees.
//!
//! A [`Shape`] is plain data: node kinds, optional text constraints, and
//! named-field sub-shapes, with named captures. One generic engine
//! ([`ShapeMatcher`]) runs any number of shapes over a tree in a single
//! walk, dispatching on node kind.

pub mod catalog;
pub mod matcher;
pub mod shape;

pub use matcher::{ShapeMatch, ShapeMatcher};
pub use shape::{Captures, FieldShape, NodeShape, Shape};
