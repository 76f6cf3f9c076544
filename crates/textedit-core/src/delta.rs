//! Structured description of a single text change.
//!
//! Every document mutation is reported as one [`DocumentChange`], expressed in **character
//! offsets**. The same value is delivered before the edit (so observers can capture the text that
//! is about to disappear) and after it (so they can shift stored offsets).

/// One `replace(offset, removed, inserted)` edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Start offset of the edit.
    pub offset: usize,
    /// Text removed at `offset` (may be empty).
    pub removed_text: String,
    /// Text inserted at `offset` (may be empty).
    pub inserted_text: String,
}

impl DocumentChange {
    /// Build a change.
    pub fn new(offset: usize, removed_text: impl Into<String>, inserted_text: impl Into<String>) -> Self {
        Self {
            offset,
            removed_text: removed_text.into(),
            inserted_text: inserted_text.into(),
        }
    }

    /// Number of removed characters (the "old length").
    pub fn removed_len(&self) -> usize {
        self.removed_text.chars().count()
    }

    /// Number of inserted characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end of the removed range in the pre-edit document.
    pub fn old_end(&self) -> usize {
        self.offset + self.removed_len()
    }

    /// Net length change.
    pub fn delta(&self) -> isize {
        self.inserted_len() as isize - self.removed_len() as isize
    }

    /// Map a pre-edit offset to a post-edit one.
    ///
    /// Offsets before the edit are untouched. Offsets inside the removed range collapse to the
    /// edit point; offsets at or after its end shift by [`delta`](Self::delta). An offset that
    /// equals `offset` is moved past the inserted text only when `move_on_insert` is set.
    pub fn shift_offset(&self, offset: usize, move_on_insert: bool) -> usize {
        if offset < self.offset || (offset == self.offset && !move_on_insert) {
            return offset;
        }
        let removed = self.removed_len();
        if offset < self.offset + removed {
            return self.offset + if move_on_insert { self.inserted_len() } else { 0 };
        }
        offset - removed + self.inserted_len()
    }

    /// Apply the standard segment update rule to `(offset, length)`.
    ///
    /// Returns `None` when the segment collapses to zero length.
    pub fn shift_segment(&self, offset: usize, length: usize) -> Option<(usize, usize)> {
        let removed = self.removed_len();
        let inserted = self.inserted_len();
        let mut start = offset;
        let mut end = offset + length;

        if self.offset <= start {
            start = start.saturating_sub(removed).max(self.offset);
        }
        if self.offset < end {
            end = end.saturating_sub(removed).max(self.offset);
        }
        if start >= end {
            return None;
        }
        if self.offset <= start {
            start += inserted;
        }
        if self.offset < end {
            end += inserted;
        }
        Some((start, end - start))
    }

    /// The edit that undoes this one.
    pub fn inverted(&self) -> Self {
        Self {
            offset: self.offset,
            removed_text: self.inserted_text.clone(),
            inserted_text: self.removed_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_offset() {
        let change = DocumentChange::new(5, "abc", "Z");
        assert_eq!(change.shift_offset(4, true), 4);
        assert_eq!(change.shift_offset(5, false), 5);
        assert_eq!(change.shift_offset(6, false), 5);
        assert_eq!(change.shift_offset(8, false), 6);
        assert_eq!(change.shift_offset(20, true), 18);
        assert_eq!(change.delta(), -2);
    }

    #[test]
    fn test_shift_segment_collapses_removed_segment() {
        let change = DocumentChange::new(2, "xyz", "");
        assert_eq!(change.shift_segment(3, 2), None);
        assert_eq!(change.shift_segment(0, 10), Some((0, 7)));
        assert_eq!(change.shift_segment(10, 2), Some((7, 2)));
    }

    #[test]
    fn test_insert_at_segment_start_moves_segment() {
        let change = DocumentChange::new(4, "", "ab");
        assert_eq!(change.shift_segment(4, 3), Some((6, 3)));
        // Insertion at the segment end does not grow it.
        assert_eq!(change.shift_segment(1, 3), Some((1, 3)));
        assert_eq!(change.inverted(), DocumentChange::new(4, "ab", ""));
    }
}
