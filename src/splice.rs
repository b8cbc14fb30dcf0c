//! Offset-addressed text splicing over the compiled module.
//!
//! Every edit is recorded against the *original* byte offsets. `finish`
//! applies them rightmost first, so an edit never shifts the text an earlier
//! recorded offset points into.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpliceError {
    #[error("edit {start}..{end} is out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("edit {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: usize, end: usize },

    #[error("edit {start}..{end} overlaps edit {other_start}..{other_end}")]
    Overlap {
        start: usize,
        end: usize,
        other_start: usize,
        other_end: usize,
    },
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
    seq: usize,
}

impl Edit {
    fn is_insert(&self) -> bool {
        self.start == self.end
    }
}

/// The working copy of the compiled text.
#[derive(Debug)]
pub struct EditBuffer {
    original: String,
    edits: Vec<Edit>,
}

impl EditBuffer {
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            edits: Vec::new(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Insert `text` before the original byte at `pos`.
    pub fn insert(&mut self, pos: usize, text: impl Into<String>) -> Result<(), SpliceError> {
        self.push(pos, pos, text.into())
    }

    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), SpliceError> {
        self.push(start, end, text.into())
    }

    pub fn remove(&mut self, start: usize, end: usize) -> Result<(), SpliceError> {
        if start == end {
            return Ok(());
        }
        self.push(start, end, String::new())
    }

    pub fn append(&mut self, text: impl Into<String>) -> Result<(), SpliceError> {
        let end = self.original.len();
        self.push(end, end, text.into())
    }

    fn push(&mut self, start: usize, end: usize, text: String) -> Result<(), SpliceError> {
        let len = self.original.len();
        if start > end || end > len {
            return Err(SpliceError::OutOfBounds { start, end, len });
        }
        if !self.original.is_char_boundary(start) || !self.original.is_char_boundary(end) {
            return Err(SpliceError::NotCharBoundary { start, end });
        }
        trace!(start, end, len = text.len(), "recorded edit");
        let seq = self.edits.len();
        self.edits.push(Edit {
            start,
            end,
            text,
            seq,
        });
        Ok(())
    }

    /// Validate and apply every recorded edit, returning the final text.
    pub fn finish(mut self) -> Result<String, SpliceError> {
        self.check_overlaps()?;

        // Rightmost first. At equal starts the range edit goes first, then
        // inserts from the latest issued to the earliest, so inserts at one
        // offset end up in issue order ahead of the range.
        self.edits.sort_by(|a, b| {
            b.start
                .cmp(&a.start)
                .then_with(|| match (a.is_insert(), b.is_insert()) {
                    (false, true) => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    _ => b.seq.cmp(&a.seq),
                })
        });

        let mut out = self.original;
        for edit in &self.edits {
            out.replace_range(edit.start..edit.end, &edit.text);
        }
        Ok(out)
    }

    fn check_overlaps(&self) -> Result<(), SpliceError> {
        let mut sorted: Vec<&Edit> = self.edits.iter().collect();
        sorted.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.is_insert().cmp(&a.is_insert()))
                .then_with(|| a.seq.cmp(&b.seq))
        });

        let mut last_range: Option<&Edit> = None;
        for edit in sorted {
            if let Some(range) = last_range {
                let inside = if edit.is_insert() {
                    edit.start > range.start && edit.start < range.end
                } else {
                    edit.start < range.end
                };
                if inside {
                    return Err(SpliceError::Overlap {
                        start: edit.start,
                        end: edit.end,
                        other_start: range.start,
                        other_end: range.end,
                    });
                }
            }
            if !edit.is_insert() {
                last_range = Some(edit);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_in_any_issue_order_resolve_against_original_offsets() {
        let mut buf = EditBuffer::new("aaa bbb ccc");
        buf.insert(0, ">").unwrap();
        buf.replace(4, 7, "BBB").unwrap();
        buf.remove(8, 11).unwrap();
        buf.append("!").unwrap();
        assert_eq!(buf.finish().unwrap(), ">aaa BBB !");
    }

    #[test]
    fn inserts_at_one_offset_keep_issue_order_before_a_range() {
        let mut buf = EditBuffer::new("0123456789");
        buf.remove(3, 5).unwrap();
        buf.insert(3, "a").unwrap();
        buf.insert(3, "b").unwrap();
        buf.insert(5, "c").unwrap();
        assert_eq!(buf.finish().unwrap(), "012abc56789");
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let mut buf = EditBuffer::new("0123456789");
        buf.remove(2, 6).unwrap();
        buf.replace(5, 8, "x").unwrap();
        assert!(matches!(buf.finish(), Err(SpliceError::Overlap { .. })));
    }

    #[test]
    fn insert_inside_removed_range_is_rejected() {
        let mut buf = EditBuffer::new("0123456789");
        buf.remove(2, 6).unwrap();
        buf.insert(4, "x").unwrap();
        assert!(matches!(buf.finish(), Err(SpliceError::Overlap { .. })));
    }

    #[test]
    fn out_of_bounds_and_char_boundaries_fail_fast() {
        let mut buf = EditBuffer::new("héllo");
        assert_eq!(
            buf.insert(42, "x"),
            Err(SpliceError::OutOfBounds {
                start: 42,
                end: 42,
                len: 6
            })
        );
        assert_eq!(
            buf.insert(2, "x"),
            Err(SpliceError::NotCharBoundary { start: 2, end: 2 })
        );
        assert_eq!(buf.edit_count(), 0);
    }
}
