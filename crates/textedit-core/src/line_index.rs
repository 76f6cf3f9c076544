//! Stage 1: Line Index
//!
//! Maps a flat character buffer to line boundaries.
//!
//! Every line is stored as a `(length, delimiter_length)` record. Delimiters are `"\r\n"`
//! (length 2), `"\n"` or a lone `"\r"` (length 1); the last line never has a delimiter.
//! Line start offsets are a prefix sum over those records and are recomputed lazily: an edit
//! only truncates the cached prefix at the first touched line, and the next query extends it as
//! far as it needs to.
//!
//! An edit rescans only the lines overlapping the edited range (plus the previous line when a
//! lone `'\r'` can pair with a newly adjacent `'\n'`), so the cost of keeping the index correct
//! is proportional to the size of the edit and the lines it touches.

use ropey::Rope;
use std::cell::RefCell;

/// One line of the document as seen by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    /// 0-based line number.
    pub line_number: usize,
    /// Offset of the first character of the line.
    pub offset: usize,
    /// Number of characters in the line, excluding the delimiter.
    pub length: usize,
    /// Number of characters in the delimiter (0, 1 or 2).
    pub delimiter_length: usize,
}

impl LineSegment {
    /// `length + delimiter_length`.
    pub fn total_length(&self) -> usize {
        self.length + self.delimiter_length
    }

    /// Offset just past the line content (the delimiter starts here).
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    /// Offset of the first character of the next line.
    pub fn next_line_offset(&self) -> usize {
        self.offset + self.total_length()
    }

    /// Returns `true` if `offset` lies within `[offset, end_offset]`.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.offset <= offset && offset <= self.end_offset()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineEntry {
    length: usize,
    delimiter_length: usize,
}

impl LineEntry {
    fn total(&self) -> usize {
        self.length + self.delimiter_length
    }
}

/// Line boundary index over a character buffer.
#[derive(Debug)]
pub struct LineIndex {
    entries: Vec<LineEntry>,
    /// Start offsets of the first `starts.len()` lines. Never empty.
    starts: RefCell<Vec<usize>>,
    text_length: usize,
}

impl LineIndex {
    /// Index of an empty document (one empty line).
    pub fn new() -> Self {
        Self {
            entries: vec![LineEntry {
                length: 0,
                delimiter_length: 0,
            }],
            starts: RefCell::new(vec![0]),
            text_length: 0,
        }
    }

    /// Build an index for `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            entries: scan_lines(text.chars(), true),
            starts: RefCell::new(vec![0]),
            text_length: text.chars().count(),
        }
    }

    /// Number of lines (at least 1).
    pub fn line_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of characters covered by the index.
    pub fn text_length(&self) -> usize {
        self.text_length
    }

    /// Get a line by number.
    pub fn segment(&self, line_number: usize) -> Option<LineSegment> {
        let entry = *self.entries.get(line_number)?;
        Some(LineSegment {
            line_number,
            offset: self.line_start(line_number),
            length: entry.length,
            delimiter_length: entry.delimiter_length,
        })
    }

    /// Line containing `offset`. Offsets inside a delimiter belong to the line the delimiter
    /// terminates; `text_length` belongs to the last line.
    pub fn line_of_offset(&self, offset: usize) -> Option<usize> {
        if offset > self.text_length {
            return None;
        }
        let mut starts = self.starts.borrow_mut();
        // Extend the cached prefix until it covers `offset`.
        loop {
            let last = starts.len() - 1;
            if last + 1 >= self.entries.len() || starts[last] + self.entries[last].total() > offset
            {
                break;
            }
            let next = starts[last] + self.entries[last].total();
            starts.push(next);
        }
        Some(match starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert_at) => insert_at - 1,
        })
    }

    /// Iterate over every line segment in order.
    pub fn segments(&self) -> impl Iterator<Item = LineSegment> + '_ {
        let mut offset = 0;
        self.entries
            .iter()
            .enumerate()
            .map(move |(line_number, entry)| {
                let segment = LineSegment {
                    line_number,
                    offset,
                    length: entry.length,
                    delimiter_length: entry.delimiter_length,
                };
                offset += entry.total();
                segment
            })
    }

    /// Update the index after `text` has been edited at `offset`: `removed_len` characters were
    /// replaced by `inserted_len` characters. `text` is the buffer content *after* the edit.
    ///
    /// The caller guarantees that `offset + removed_len` was within the pre-edit length.
    pub fn apply_edit(&mut self, offset: usize, removed_len: usize, inserted_len: usize, text: &Rope) {
        let old_end = offset + removed_len;
        let (Some(mut first), Some(last)) =
            (self.line_of_offset(offset), self.line_of_offset(old_end))
        else {
            debug_assert!(false, "edit outside the indexed text");
            return;
        };

        let mut region_start = self.line_start(first);
        let region_old_end = self.line_start(last) + self.entries[last].total();
        let region_new_end = region_old_end - removed_len + inserted_len;

        // A lone '\r' ending the previous line pairs with a '\n' that now starts the region.
        if first > 0
            && self.entries[first - 1].delimiter_length == 1
            && region_start < text.len_chars()
            && text.char(region_start) == '\n'
            && text.char(region_start - 1) == '\r'
        {
            first -= 1;
            region_start = self.line_start(first);
        }

        let is_final = last + 1 == self.entries.len();
        let rescanned = scan_lines(
            text.slice(region_start..region_new_end).chars(),
            is_final,
        );
        let touched = rescanned.len();
        self.entries.splice(first..=last, rescanned);
        self.text_length = self.text_length - removed_len + inserted_len;
        self.starts.get_mut().truncate(first + 1);

        tracing::trace!(
            target: "document.buffer",
            offset,
            removed_len,
            inserted_len,
            first_line = first,
            replaced_lines = last + 1 - first,
            new_lines = touched,
            "line_index_update"
        );
    }

    fn line_start(&self, line_number: usize) -> usize {
        let mut starts = self.starts.borrow_mut();
        while starts.len() <= line_number {
            let last = starts.len() - 1;
            let next = starts[last] + self.entries[last].total();
            starts.push(next);
        }
        starts[line_number]
    }

    /// Verify the adjacency invariant over every line.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let segments: Vec<_> = self.segments().collect();
        for pair in segments.windows(2) {
            assert_eq!(pair[0].next_line_offset(), pair[1].offset);
            assert!(pair[0].delimiter_length > 0);
            assert_eq!(self.segment(pair[1].line_number), Some(pair[1]));
        }
        let last = segments[segments.len() - 1];
        assert_eq!(last.delimiter_length, 0);
        assert_eq!(last.next_line_offset(), self.text_length);
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `chars` into line records. Unless `is_final`, the input ends on a delimiter and no
/// trailing empty record is produced for it.
fn scan_lines(chars: impl Iterator<Item = char>, is_final: bool) -> Vec<LineEntry> {
    let mut entries = Vec::new();
    let mut length = 0;
    let mut chars = chars.peekable();
    while let Some(ch) = chars.next() {
        let delimiter_length = match ch {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                2
            }
            '\r' | '\n' => 1,
            _ => {
                length += 1;
                continue;
            }
        };
        entries.push(LineEntry {
            length,
            delimiter_length,
        });
        length = 0;
    }
    if is_final || length > 0 {
        debug_assert!(is_final, "rescanned region must end on a delimiter");
        entries.push(LineEntry {
            length,
            delimiter_length: 0,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(index: &mut LineIndex, rope: &mut Rope, offset: usize, remove: usize, insert: &str) {
        rope.remove(offset..offset + remove);
        rope.insert(offset, insert);
        index.apply_edit(offset, remove, insert.chars().count(), rope);
        index.assert_consistent();
        let fresh = LineIndex::from_text(&rope.to_string());
        assert_eq!(index.entries, fresh.entries, "incremental index diverged");
    }

    #[test]
    fn test_empty_document_has_one_line() {
        let index = LineIndex::new();
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.segment(0).unwrap().total_length(), 0);
        assert_eq!(index.line_of_offset(0), Some(0));
        assert_eq!(index.line_of_offset(1), None);
    }

    #[test]
    fn test_mixed_delimiters() {
        let index = LineIndex::from_text("a\r\nbb\ncc\rd");
        let segments: Vec<_> = index.segments().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!((segments[0].length, segments[0].delimiter_length), (1, 2));
        assert_eq!((segments[1].offset, segments[1].delimiter_length), (3, 1));
        assert_eq!((segments[2].offset, segments[2].delimiter_length), (6, 1));
        assert_eq!((segments[3].offset, segments[3].length), (9, 1));
        index.assert_consistent();
    }

    #[test]
    fn test_trailing_delimiter_yields_empty_last_line() {
        let index = LineIndex::from_text("x\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.segment(1).unwrap().offset, 2);
        assert_eq!(index.line_of_offset(2), Some(1));
    }

    #[test]
    fn test_offset_inside_crlf_belongs_to_terminated_line() {
        let index = LineIndex::from_text("ab\r\ncd");
        assert_eq!(index.line_of_offset(3), Some(0));
        assert_eq!(index.line_of_offset(4), Some(1));
    }

    #[test]
    fn test_insert_updates_following_offsets() {
        let mut rope = Rope::from_str("ab\ncd");
        let mut index = LineIndex::from_text("ab\ncd");
        edit(&mut index, &mut rope, 2, 0, "X");
        assert_eq!(index.segment(0).unwrap().length, 3);
        assert_eq!(index.segment(1).unwrap().offset, 4);
    }

    #[test]
    fn test_edits_that_split_and_join_crlf() {
        let mut rope = Rope::from_str("a\r\nb");
        let mut index = LineIndex::from_text("a\r\nb");
        // Split the pair: "a\rX\nb" has three lines.
        edit(&mut index, &mut rope, 2, 0, "X");
        assert_eq!(index.line_count(), 3);
        // Join it again.
        edit(&mut index, &mut rope, 2, 1, "");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.segment(0).unwrap().delimiter_length, 2);
        // Remove the '\r' half.
        edit(&mut index, &mut rope, 1, 1, "");
        assert_eq!(index.segment(0).unwrap().delimiter_length, 1);
    }

    #[test]
    fn test_multi_line_replace() {
        let text = "one\ntwo\nthree\nfour";
        let mut rope = Rope::from_str(text);
        let mut index = LineIndex::from_text(text);
        edit(&mut index, &mut rope, 2, 9, "X\nY\nZ\n");
        assert_eq!(rope.to_string(), "onX\nY\nZ\nee\nfour");
        assert_eq!(index.line_count(), 5);
        let everything = rope.len_chars();
        edit(&mut index, &mut rope, 0, everything, "");
        assert_eq!(index.line_count(), 1);
    }
}
