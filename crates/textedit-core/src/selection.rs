//! Selections over character offsets.
//!
//! The manager keeps its selections normalised: sorted by start, with overlapping ranges merged
//! and exact duplicates dropped. Ranges that merely touch stay separate.

use crate::buffer::TextBuffer;
use crate::delta::DocumentChange;
use crate::error::Result;
use crate::location::TextLocation;
use crate::markers::MarkerStrategy;

/// One selected range, `offset..offset + length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Selection {
    offset: usize,
    length: usize,
}

impl Selection {
    /// Select `length` characters at `offset`.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Select between two locations, in either order.
    pub fn from_locations(buffer: &TextBuffer, a: TextLocation, b: TextLocation) -> Result<Self> {
        let a = buffer.position_to_offset(a)?;
        let b = buffer.position_to_offset(b)?;
        Ok(Self::new(a.min(b), a.abs_diff(b)))
    }

    /// Start offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in characters.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Exclusive end offset.
    pub fn end_offset(&self) -> usize {
        self.offset + self.length
    }

    /// Returns `true` for a zero-length selection.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Start location.
    pub fn start_position(&self, buffer: &TextBuffer) -> Result<TextLocation> {
        buffer.offset_to_position(self.offset)
    }

    /// End location.
    pub fn end_position(&self, buffer: &TextBuffer) -> Result<TextLocation> {
        buffer.offset_to_position(self.end_offset())
    }

    /// Returns `true` if `offset` lies in the selection, both ends included.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.offset <= offset && offset <= self.end_offset()
    }

    /// The selected text.
    pub fn selected_text(&self, buffer: &TextBuffer) -> Result<String> {
        buffer.get_text(self.offset, self.length)
    }
}

/// Columns of a line covered by a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRange {
    /// The line is selected from start to end, delimiter included.
    WholeLine,
    /// Columns `start..end`. `end` may be one past the line length when the delimiter is selected.
    Span {
        /// First selected column.
        start: usize,
        /// Exclusive end column.
        end: usize,
    },
}

/// The selections of a document.
#[derive(Debug, Default)]
pub struct SelectionManager {
    selections: Vec<Selection>,
    /// Where the current selection was started; extended selections pivot around it.
    anchor: Option<TextLocation>,
}

impl SelectionManager {
    /// No selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current selections, normalised.
    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Returns `true` if at least one range is selected.
    pub fn has_something_selected(&self) -> bool {
        !self.selections.is_empty()
    }

    /// The anchor of the current selection.
    pub fn anchor(&self) -> Option<TextLocation> {
        self.anchor
    }

    /// Replace everything with one selection. Returns `false` if it was already the only one.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        if self.selections == [selection] {
            return false;
        }
        self.selections = vec![selection];
        true
    }

    /// Replace everything with `selections`, normalised.
    pub fn set_selections(&mut self, selections: Vec<Selection>) {
        self.selections = normalize(selections);
    }

    /// Add a selection, merging it with any it overlaps.
    pub fn add_selection(&mut self, selection: Selection) {
        let mut selections = std::mem::take(&mut self.selections);
        selections.push(selection);
        self.selections = normalize(selections);
    }

    /// Extend the primary selection from the caret's old position to its new one.
    ///
    /// Without a selection this selects `old..new` and anchors at `old`. Otherwise the first
    /// selection is rebuilt between the anchor and `new`. Returns the affected line range.
    pub fn extend_selection(
        &mut self,
        buffer: &TextBuffer,
        old: TextLocation,
        new: TextLocation,
    ) -> Result<Option<(usize, usize)>> {
        if old == new {
            return Ok(None);
        }
        let (min, max) = if old >= new { (new, old) } else { (old, new) };
        let anchor = match self.anchor {
            Some(anchor) if self.has_something_selected() => anchor,
            _ => {
                self.anchor = Some(old);
                old
            }
        };
        let selection = Selection::from_locations(buffer, anchor, new)?;
        match self.selections.first_mut() {
            Some(first) => *first = selection,
            None => self.selections.push(selection),
        }
        let selections = std::mem::take(&mut self.selections);
        self.selections = normalize(selections);
        Ok(Some((min.line.min(anchor.line), max.line.max(anchor.line))))
    }

    /// Set the anchor explicitly.
    pub fn set_anchor(&mut self, anchor: Option<TextLocation>) {
        self.anchor = anchor;
    }

    /// Remove every selection, returning them.
    pub fn clear(&mut self) -> Vec<Selection> {
        self.anchor = None;
        std::mem::take(&mut self.selections)
    }

    /// Concatenated text of every selection.
    pub fn selected_text(&self, buffer: &TextBuffer) -> Result<String> {
        let mut text = String::new();
        for selection in &self.selections {
            text.push_str(&selection.selected_text(buffer)?);
        }
        Ok(text)
    }

    /// Returns `true` if a read-only marker intersects any selection.
    pub fn intersects_read_only_marker(&self, markers: &MarkerStrategy) -> bool {
        self.selections
            .iter()
            .any(|selection| markers.has_read_only_marker_in(selection.offset, selection.length))
    }

    /// The selection containing `offset`.
    pub fn get_selection_at(&self, offset: usize) -> Option<&Selection> {
        self.selections
            .iter()
            .find(|selection| selection.contains_offset(offset))
    }

    /// Returns `true` if `offset` is selected.
    pub fn is_selected(&self, offset: usize) -> bool {
        self.get_selection_at(offset).is_some()
    }

    /// Selected columns of `line`, if any selection touches it.
    pub fn get_selection_at_line(&self, buffer: &TextBuffer, line: usize) -> Option<ColumnRange> {
        for selection in &self.selections {
            let (Ok(start), Ok(end)) = (selection.start_position(buffer), selection.end_position(buffer))
            else {
                continue;
            };
            if start.line < line && line < end.line {
                return Some(ColumnRange::WholeLine);
            }
            if start.line == line {
                let end_column = if end.line == line {
                    end.column
                } else {
                    buffer.line_segment(line).ok()?.length + 1
                };
                return Some(ColumnRange::Span {
                    start: start.column,
                    end: end_column,
                });
            }
            if end.line == line {
                return Some(ColumnRange::Span {
                    start: 0,
                    end: end.column,
                });
            }
        }
        None
    }

    /// Shift selections after an edit. Selections whose text was deleted disappear.
    pub(crate) fn apply_change(&mut self, change: &DocumentChange) {
        if self.selections.is_empty() {
            return;
        }
        let shifted = self
            .selections
            .iter()
            .filter_map(|selection| {
                if selection.is_empty() {
                    let offset = change.shift_offset(selection.offset, false);
                    return Some(Selection::new(offset, 0));
                }
                change
                    .shift_segment(selection.offset, selection.length)
                    .map(|(offset, length)| Selection::new(offset, length))
            })
            .collect();
        self.selections = normalize(shifted);
    }
}

/// Sort, merge overlapping ranges, drop exact duplicates.
fn normalize(mut selections: Vec<Selection>) -> Vec<Selection> {
    selections.sort();
    let mut merged: Vec<Selection> = Vec::with_capacity(selections.len());
    for selection in selections {
        match merged.last_mut() {
            Some(last) if selection.offset < last.end_offset() => {
                let end = last.end_offset().max(selection.end_offset());
                last.length = end - last.offset;
            }
            Some(last) if *last == selection => {}
            _ => merged.push(selection),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::Marker;

    #[test]
    fn test_normalize_merges_overlaps_but_not_touching() {
        let mut manager = SelectionManager::new();
        manager.set_selections(vec![
            Selection::new(10, 5),
            Selection::new(0, 3),
            Selection::new(12, 6),
            Selection::new(3, 2),
            Selection::new(0, 3),
        ]);
        assert_eq!(
            manager.selections(),
            &[Selection::new(0, 3), Selection::new(3, 2), Selection::new(10, 8)]
        );
    }

    #[test]
    fn test_selection_at_line() {
        let buffer = TextBuffer::from_text("one\ntwo\nthree\nfour");
        let mut manager = SelectionManager::new();
        let selection =
            Selection::from_locations(&buffer, TextLocation::new(2, 3), TextLocation::new(0, 1))
                .unwrap();
        manager.set_selection(selection);
        assert_eq!(
            manager.get_selection_at_line(&buffer, 0),
            Some(ColumnRange::Span { start: 1, end: 4 })
        );
        assert_eq!(manager.get_selection_at_line(&buffer, 1), Some(ColumnRange::WholeLine));
        assert_eq!(
            manager.get_selection_at_line(&buffer, 2),
            Some(ColumnRange::Span { start: 0, end: 3 })
        );
        assert_eq!(manager.get_selection_at_line(&buffer, 3), None);
        assert_eq!(manager.selected_text(&buffer).unwrap(), "ne\ntwo\nthr");
        assert!(manager.is_selected(1));
        assert!(manager.is_selected(11));
        assert!(!manager.is_selected(12));
    }

    #[test]
    fn test_extend_selection_pivots_on_anchor() {
        let buffer = TextBuffer::from_text("abcdef\nghijkl");
        let mut manager = SelectionManager::new();
        let lines = manager
            .extend_selection(&buffer, TextLocation::new(0, 2), TextLocation::new(0, 4))
            .unwrap();
        assert_eq!(lines, Some((0, 0)));
        assert_eq!(manager.selections(), &[Selection::new(2, 2)]);

        manager
            .extend_selection(&buffer, TextLocation::new(0, 4), TextLocation::new(0, 0))
            .unwrap();
        assert_eq!(manager.selections(), &[Selection::new(0, 2)]);

        manager
            .extend_selection(&buffer, TextLocation::new(0, 0), TextLocation::new(1, 1))
            .unwrap();
        assert_eq!(manager.selections(), &[Selection::new(2, 6)]);
        assert_eq!(manager.clear().len(), 1);
        assert!(manager.anchor().is_none());
    }

    #[test]
    fn test_read_only_marker_detection() {
        let mut markers = MarkerStrategy::new();
        markers.add(Marker::read_only(8, 2));
        let mut manager = SelectionManager::new();
        manager.set_selection(Selection::new(0, 8));
        assert!(!manager.intersects_read_only_marker(&markers));
        manager.add_selection(Selection::new(9, 3));
        assert!(manager.intersects_read_only_marker(&markers));
    }

    #[test]
    fn test_selections_follow_edits() {
        let mut manager = SelectionManager::new();
        manager.set_selections(vec![Selection::new(2, 3), Selection::new(10, 2)]);
        manager.apply_change(&DocumentChange::new(0, "ab", ""));
        assert_eq!(manager.selections(), &[Selection::new(0, 3), Selection::new(8, 2)]);
        manager.apply_change(&DocumentChange::new(7, "xxxx", ""));
        assert_eq!(manager.selections(), &[Selection::new(0, 3)]);
    }
}
