//! Edits and transform plans.
//!
//! A plan is a sorted list of disjoint byte-range edits. Applying it splices
//! replacement text into the original; bytes outside the edited ranges are
//! copied through unchanged.

use std::ops::Range;

use promptguard_core::errors::TransformError;
use serde::Serialize;

/// Replace `range` with `text`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            text: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.range.start == self.range.end
    }
}

/// Ordered, non-overlapping edits for one file. Empty means "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformPlan {
    edits: Vec<Edit>,
}

impl TransformPlan {
    /// Sort and validate. Ranges must be disjoint; two insertions at the same
    /// offset count as overlapping since their order would be arbitrary.
    pub fn new(mut edits: Vec<Edit>) -> Result<Self, TransformError> {
        edits.sort_by(|a, b| {
            (a.range.start, a.range.end).cmp(&(b.range.start, b.range.end))
        });
        for pair in edits.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let overlap = a.range.end > b.range.start
                || (a.is_insertion() && b.is_insertion() && a.range.start == b.range.start);
            if overlap {
                return Err(TransformError::OverlappingEdits {
                    first_start: a.range.start,
                    first_end: a.range.end,
                    second_start: b.range.start,
                    second_end: b.range.end,
                });
            }
        }
        Ok(Self { edits })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Splice the edits into `source`.
    pub fn apply(&self, source: &str) -> Result<String, TransformError> {
        let added: usize = self.edits.iter().map(|e| e.text.len()).sum();
        let mut out = String::with_capacity(source.len() + added);
        let mut cursor = 0;
        for edit in &self.edits {
            let Range { start, end } = edit.range.clone();
            if start < cursor
                || end > source.len()
                || !source.is_char_boundary(start)
                || !source.is_char_boundary(end)
            {
                return Err(TransformError::InvalidRange {
                    start,
                    end,
                    len: source.len(),
                });
            }
            out.push_str(&source[cursor..start]);
            out.push_str(&edit.text);
            cursor = end;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_in_order_regardless_of_input_order() {
        let plan = TransformPlan::new(vec![
            Edit::insert(5, "!"),
            Edit::replace(0..1, "J"),
        ])
        .unwrap();
        assert_eq!(plan.apply("hello world").unwrap(), "Jello! world");
    }

    #[test]
    fn insertion_adjacent_to_replacement_is_allowed() {
        let plan = TransformPlan::new(vec![Edit::replace(2..4, "XY"), Edit::insert(4, "+")]).unwrap();
        assert_eq!(plan.apply("abcdef").unwrap(), "abXY+ef");
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        assert!(TransformPlan::new(vec![Edit::replace(0..3, "a"), Edit::replace(2..5, "b")]).is_err());
        assert!(TransformPlan::new(vec![Edit::insert(3, "a"), Edit::insert(3, "b")]).is_err());
        assert!(TransformPlan::new(vec![Edit::replace(0..5, "a"), Edit::insert(2, "b")]).is_err());
    }

    #[test]
    fn out_of_bounds_edit_fails_to_apply() {
        let plan = TransformPlan::new(vec![Edit::delete(3..10)]).unwrap();
        assert!(plan.apply("abc").is_err());
    }
}
