//! Offset-stable batched text edits.
//!
//! Every edit is recorded against the offsets of one source text and the
//! whole batch is applied back to front, so no edit shifts another.

use std::cmp::Reverse;

use crate::model::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Remove(Span),
    Insert { at: usize, text: String },
}

impl Edit {
    fn start(&self) -> usize {
        match self {
            Edit::Remove(span) => span.start,
            Edit::Insert { at, .. } => *at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditBatch {
    edits: Vec<Edit>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, span: Span) {
        if span.start < span.end {
            self.edits.push(Edit::Remove(span));
        }
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.edits.push(Edit::Insert { at, text });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Removal spans after duplicate and overlap filtering, in source order.
    pub fn removals(&self) -> Vec<Span> {
        let mut spans: Vec<Span> = self
            .edits
            .iter()
            .filter_map(|e| match e {
                Edit::Remove(span) => Some(*span),
                Edit::Insert { .. } => None,
            })
            .collect();
        spans.sort_by_key(|s| (s.start, Reverse(s.end)));

        let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans {
            match kept.last() {
                Some(last) if span.start < last.end => {
                    if span != *last {
                        log::debug!(
                            "dropping removal {}..{} overlapping {}..{}",
                            span.start,
                            span.end,
                            last.start,
                            last.end
                        );
                    }
                }
                _ => kept.push(span),
            }
        }
        kept
    }

    /// Apply every edit to `source`, whose offsets the batch was built from.
    ///
    /// Edits run from the highest offset down. At equal offsets the removal
    /// runs first, and insertions at one offset keep their queue order.
    pub fn apply(&self, source: &str) -> String {
        let mut ordered: Vec<(usize, u8, Reverse<usize>, Edit)> = self
            .removals()
            .into_iter()
            .map(|span| (span.start, 0, Reverse(0), Edit::Remove(span)))
            .collect();
        ordered.extend(self.edits.iter().enumerate().filter_map(|(seq, e)| match e {
            Edit::Insert { .. } => Some((e.start(), 1, Reverse(seq), e.clone())),
            Edit::Remove(_) => None,
        }));
        ordered.sort_by_key(|(start, kind, seq, _)| (Reverse(*start), *kind, *seq));

        let mut out = source.to_string();
        for (_, _, _, edit) in ordered {
            match edit {
                Edit::Remove(span) => out.replace_range(span.start..span.end, ""),
                Edit::Insert { at, text } => out.insert_str(at, &text),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_do_not_shift_each_other() {
        let mut batch = EditBatch::new();
        batch.remove(Span::new(0, 2));
        batch.insert(5, "X");
        batch.remove(Span::new(7, 9));
        assert_eq!(batch.apply("aabbbccdd"), "bbbXcc");
    }

    #[test]
    fn removal_before_insertion_at_same_offset() {
        let mut batch = EditBatch::new();
        batch.insert(2, "new");
        batch.remove(Span::new(2, 4));
        assert_eq!(batch.apply("ab--cd"), "abnewcd");
    }

    #[test]
    fn insertions_keep_queue_order() {
        let mut batch = EditBatch::new();
        batch.insert(1, "1");
        batch.insert(1, "2");
        assert_eq!(batch.apply("ab"), "a12b");
    }

    #[test]
    fn duplicate_and_overlapping_removals_collapse() {
        let mut batch = EditBatch::new();
        batch.remove(Span::new(1, 3));
        batch.remove(Span::new(1, 3));
        batch.remove(Span::new(2, 4));
        assert_eq!(batch.removals(), vec![Span::new(1, 3)]);
        assert_eq!(batch.apply("abcdef"), "adef");
    }
}
