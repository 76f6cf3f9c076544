//! Stage 2: Text Buffer
//!
//! Character storage ([`ropey::Rope`]) plus the [`LineIndex`] that describes it. Every mutation
//! updates both before returning, so line queries are consistent immediately after each edit.
//!
//! Offsets and lengths are in characters. Mutations validate their arguments and fail with
//! [`DocumentError::OutOfRange`] instead of clamping; the location helpers
//! ([`TextBuffer::validate`], [`TextBuffer::position_to_offset`]) clamp columns. `validate`
//! clamps to the line length; `position_to_offset` also admits the column inside a CRLF pair.

use crate::error::{DocumentError, Result};
use crate::line_index::{LineIndex, LineSegment};
use crate::location::TextLocation;
use crate::text::{char_len, snap_to_grapheme_boundary};
use ropey::Rope;

/// Mutable character buffer with a line index.
#[derive(Debug, Default)]
pub struct TextBuffer {
    rope: Rope,
    lines: LineIndex,
}

impl TextBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            lines: LineIndex::from_text(text),
        }
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns `true` if the buffer holds no characters.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// The whole content.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole content and rebuild the index.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.lines = LineIndex::from_text(text);
    }

    /// The line index.
    pub fn line_index(&self) -> &LineIndex {
        &self.lines
    }

    /// Character at `offset` (`offset < len`).
    pub fn char_at(&self, offset: usize) -> Result<char> {
        self.rope
            .get_char(offset)
            .ok_or_else(|| DocumentError::out_of_range(offset, 1, self.len()))
    }

    /// Characters starting at `offset` (`offset <= len`).
    pub fn chars_from(&self, offset: usize) -> Result<ropey::iter::Chars<'_>> {
        self.rope
            .get_chars_at(offset)
            .ok_or_else(|| DocumentError::out_of_range(offset, 0, self.len()))
    }

    /// `length` characters starting at `offset`.
    pub fn get_text(&self, offset: usize, length: usize) -> Result<String> {
        self.check_range(offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.replace(offset, 0, text).map(|_| ())
    }

    /// Remove `length` characters at `offset`, returning them.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<String> {
        self.replace(offset, length, "")
    }

    /// Replace `length` characters at `offset` with `text`, returning the removed text.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<String> {
        self.check_range(offset, length)?;
        let removed = self.rope.slice(offset..offset + length).to_string();
        if length > 0 {
            self.rope.remove(offset..offset + length);
        }
        if !text.is_empty() {
            self.rope.insert(offset, text);
        }
        self.lines
            .apply_edit(offset, length, char_len(text), &self.rope);
        Ok(removed)
    }

    /// Number of lines (at least 1).
    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Get a line by number.
    pub fn line_segment(&self, line: usize) -> Result<LineSegment> {
        self.lines
            .segment(line)
            .ok_or(DocumentError::LineOutOfRange {
                line,
                line_count: self.line_count(),
            })
    }

    /// Line containing `offset` (`offset <= len`).
    pub fn line_number_for_offset(&self, offset: usize) -> Result<usize> {
        self.lines
            .line_of_offset(offset)
            .ok_or_else(|| DocumentError::out_of_range(offset, 0, self.len()))
    }

    /// Segment of the line containing `offset`.
    pub fn line_segment_for_offset(&self, offset: usize) -> Result<LineSegment> {
        self.line_segment(self.line_number_for_offset(offset)?)
    }

    /// Text of a line without its delimiter.
    pub fn line_text(&self, line: usize) -> Result<String> {
        let segment = self.line_segment(line)?;
        Ok(self
            .rope
            .slice(segment.offset..segment.end_offset())
            .to_string())
    }

    /// Delimiter of a line (`""` for the last line).
    pub fn line_delimiter(&self, line: usize) -> Result<String> {
        let segment = self.line_segment(line)?;
        Ok(self
            .rope
            .slice(segment.end_offset()..segment.next_line_offset())
            .to_string())
    }

    /// Convert a location to an offset.
    ///
    /// The column is clamped to the last offset that still belongs to the line, so the column
    /// between the `\r` and `\n` of a CRLF delimiter is accepted and round-trips through
    /// [`TextBuffer::offset_to_position`].
    pub fn position_to_offset(&self, location: TextLocation) -> Result<usize> {
        let segment = self.line_segment(location.line)?;
        let max_column = segment.length + segment.delimiter_length.saturating_sub(1);
        Ok(segment.offset + location.column.min(max_column))
    }

    /// Convert an offset to a location. An offset inside a CRLF pair gets column `length + 1`.
    pub fn offset_to_position(&self, offset: usize) -> Result<TextLocation> {
        let segment = self.line_segment_for_offset(offset)?;
        Ok(TextLocation::new(segment.line_number, offset - segment.offset))
    }

    /// Clamp the line of `location` into the document and its column to the line length.
    pub fn clamp(&self, location: TextLocation) -> TextLocation {
        let line = location.line.min(self.line_count() - 1);
        let length = self.lines.segment(line).map_or(0, |segment| segment.length);
        TextLocation::new(line, location.column.min(length))
    }

    /// Clamp `location` into the document and snap it to a grapheme boundary.
    pub fn validate(&self, location: TextLocation) -> TextLocation {
        let clamped = self.clamp(location);
        let Ok(text) = self.line_text(clamped.line) else {
            return TextLocation::zero();
        };
        TextLocation::new(clamped.line, snap_to_grapheme_boundary(&text, clamped.column))
    }

    fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        let text_length = self.len();
        match offset.checked_add(length) {
            Some(end) if end <= text_length => Ok(()),
            _ => Err(DocumentError::out_of_range(offset, length, text_length)),
        }
    }
}
