//! Stage 4: Folding
//!
//! [`FoldingManager`] keeps a set of [`Fold`]s sorted by start position and answers the
//! line-level questions a view needs: which folds start, end or contain a line, whether a line is
//! hidden, and how logical lines map to visible rows once folded regions collapse to one row.
//!
//! Folds are stored as character segments (`offset`/`length`); their start and end locations are
//! derived from the buffer and refreshed after every edit. A fold set must be strictly nested:
//! two folds are either disjoint or one contains the other. [`FoldingManager::update_folds`]
//! rejects anything else with
//! [`DocumentError::MalformedFoldSet`](crate::DocumentError::MalformedFoldSet).
//!
//! The first line of a folded region stays visible and its last line shares that row, so
//! only the lines strictly between the two are hidden.

use crate::buffer::TextBuffer;
use crate::delta::DocumentChange;
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::location::TextLocation;
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Placeholder shown for a folded region when the strategy supplies none.
pub const DEFAULT_FOLD_TEXT: &str = "...";

/// A collapsible region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    offset: usize,
    length: usize,
    start: TextLocation,
    end: TextLocation,
    fold_text: String,
    is_folded: bool,
}

impl Fold {
    /// Build a fold covering `length` characters at `offset`.
    pub fn new(
        buffer: &TextBuffer,
        offset: usize,
        length: usize,
        fold_text: impl Into<String>,
        is_folded: bool,
    ) -> Result<Self> {
        let start = buffer.offset_to_position(offset)?;
        let end = buffer.offset_to_position(offset + length)?;
        Ok(Self {
            offset,
            length,
            start,
            end,
            fold_text: normalize_fold_text(fold_text.into()),
            is_folded,
        })
    }

    /// Build a fold between two locations.
    ///
    /// Lines are clamped into the document and columns to their line length. An end before the
    /// start produces an empty fold, which [`FoldingManager::update_folds`] rejects.
    pub fn from_locations(
        buffer: &TextBuffer,
        start: TextLocation,
        end: TextLocation,
        fold_text: impl Into<String>,
        is_folded: bool,
    ) -> Self {
        let start = buffer.clamp(start);
        let end = buffer.clamp(end);
        let offset = buffer.position_to_offset(start).unwrap_or(0);
        let end_offset = buffer.position_to_offset(end).unwrap_or(offset);
        Self {
            offset,
            length: end_offset.saturating_sub(offset),
            start,
            end,
            fold_text: normalize_fold_text(fold_text.into()),
            is_folded,
        }
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

    /// Start location.
    pub fn start(&self) -> TextLocation {
        self.start
    }

    /// End location.
    pub fn end(&self) -> TextLocation {
        self.end
    }

    /// Line of the start location.
    pub fn start_line(&self) -> usize {
        self.start.line
    }

    /// Column of the start location.
    pub fn start_column(&self) -> usize {
        self.start.column
    }

    /// Line of the end location.
    pub fn end_line(&self) -> usize {
        self.end.line
    }

    /// Column of the end location.
    pub fn end_column(&self) -> usize {
        self.end.column
    }

    /// Placeholder text shown while folded.
    pub fn fold_text(&self) -> &str {
        &self.fold_text
    }

    /// Whether the region is collapsed.
    pub fn is_folded(&self) -> bool {
        self.is_folded
    }

    /// The folded text itself.
    pub fn inner_text(&self, buffer: &TextBuffer) -> Result<String> {
        buffer.get_text(self.offset, self.length)
    }

    fn contains(&self, other: &Fold) -> bool {
        self.offset <= other.offset && other.end_offset() <= self.end_offset()
    }

    fn refresh_locations(&mut self, buffer: &TextBuffer) {
        if let (Ok(start), Ok(end)) = (
            buffer.offset_to_position(self.offset),
            buffer.offset_to_position(self.end_offset()),
        ) {
            self.start = start;
            self.end = end;
        }
    }
}

impl PartialOrd for Fold {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Start offset first; at equal offsets the enclosing (longer) fold sorts first.
impl Ord for Fold {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.offset, Reverse(self.length), &self.fold_text, self.is_folded).cmp(&(
            other.offset,
            Reverse(other.length),
            &other.fold_text,
            other.is_folded,
        ))
    }
}

fn normalize_fold_text(text: String) -> String {
    if text.is_empty() {
        DEFAULT_FOLD_TEXT.to_string()
    } else {
        text
    }
}

/// Produces the fold set of a document.
pub trait FoldingStrategy: Send + Sync {
    /// Compute every fold of `document`. `file_name` lets a strategy vary by file type.
    fn generate_folds(&self, document: &Document, file_name: Option<&str>) -> Vec<Fold>;
}

/// Sorted fold storage with line queries and visible-line mapping.
#[derive(Default)]
pub struct FoldingManager {
    folds: Vec<Fold>,
    /// Indices into `folds`, ordered by end location.
    by_end: Vec<usize>,
    /// Indices of top-level folded folds; rebuilt lazily.
    top_level: RefCell<Option<Vec<usize>>>,
    strategy: Option<Arc<dyn FoldingStrategy>>,
}

impl std::fmt::Debug for FoldingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FoldingManager")
            .field("folds", &self.folds)
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}

impl FoldingManager {
    /// Create an empty manager without a strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// All folds, sorted by start position.
    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    /// Number of folds.
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// Returns `true` if there are no folds.
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// The strategy used by [`Document::update_folds_from_strategy`].
    pub fn strategy(&self) -> Option<Arc<dyn FoldingStrategy>> {
        self.strategy.clone()
    }

    /// Install or remove the folding strategy.
    pub fn set_strategy(&mut self, strategy: Option<Arc<dyn FoldingStrategy>>) {
        self.strategy = strategy;
    }

    /// Replace the fold set.
    ///
    /// The new folds are sorted and checked for strict nesting. Folds whose offset and length
    /// match an existing fold keep that fold's folded state. On error nothing changes.
    pub fn update_folds(&mut self, mut new_folds: Vec<Fold>) -> Result<()> {
        new_folds.sort();
        new_folds.dedup_by(|a, b| a.offset == b.offset && a.length == b.length);
        if let Err(err) = validate_nesting(&new_folds) {
            warn!(target: "document.folding", error = %err, "rejected_fold_set");
            return Err(err);
        }

        // Both lists are sorted by (offset, Reverse(length)); walk them together.
        let mut old = self.folds.iter().peekable();
        for fold in &mut new_folds {
            let key = (fold.offset, Reverse(fold.length));
            while old
                .peek()
                .is_some_and(|existing| (existing.offset, Reverse(existing.length)) < key)
            {
                old.next();
            }
            if let Some(existing) = old.peek()
                && existing.offset == fold.offset
                && existing.length == fold.length
            {
                fold.is_folded = existing.is_folded;
            }
        }

        debug!(
            target: "document.folding",
            old = self.folds.len(),
            new = new_folds.len(),
            "update_folds"
        );
        self.folds = new_folds;
        self.rebuild_indices();
        Ok(())
    }

    /// Remove every fold.
    pub fn clear(&mut self) {
        self.folds.clear();
        self.rebuild_indices();
    }

    /// Fold or unfold the fold at `index`. Returns `true` if the state changed.
    pub fn set_folded(&mut self, index: usize, folded: bool) -> bool {
        let Some(fold) = self.folds.get_mut(index) else {
            return false;
        };
        if fold.is_folded == folded {
            return false;
        }
        fold.is_folded = folded;
        self.invalidate_top_level();
        true
    }

    /// Flip the state of the fold at `index`. Returns `false` if there is no such fold.
    pub fn toggle_fold(&mut self, index: usize) -> bool {
        match self.folds.get(index) {
            Some(fold) => {
                let folded = !fold.is_folded;
                self.set_folded(index, folded)
            }
            None => false,
        }
    }

    /// Fold every region. Returns `true` if anything changed.
    pub fn fold_all(&mut self) -> bool {
        self.set_all(true)
    }

    /// Unfold every region. Returns `true` if anything changed.
    pub fn unfold_all(&mut self) -> bool {
        self.set_all(false)
    }

    fn set_all(&mut self, folded: bool) -> bool {
        let mut changed = false;
        for fold in &mut self.folds {
            changed |= fold.is_folded != folded;
            fold.is_folded = folded;
        }
        if changed {
            self.invalidate_top_level();
        }
        changed
    }

    /// Shift every fold after an edit. `buffer` holds the post-edit text.
    ///
    /// Returns `true` if some fold collapsed to zero length and was dropped.
    pub(crate) fn apply_change(&mut self, change: &DocumentChange, buffer: &TextBuffer) -> bool {
        if self.folds.is_empty() {
            return false;
        }
        let before = self.folds.len();
        self.folds.retain_mut(|fold| match change.shift_segment(fold.offset, fold.length) {
            Some((offset, length)) => {
                fold.offset = offset;
                fold.length = length;
                fold.refresh_locations(buffer);
                true
            }
            None => false,
        });
        // The shift is monotonic, so nesting survives; ties may need reordering.
        self.folds.sort();
        self.rebuild_indices();
        let dropped = before - self.folds.len();
        if dropped > 0 {
            trace!(target: "document.folding", dropped, "collapsed_folds_removed");
        }
        dropped > 0
    }

    fn rebuild_indices(&mut self) {
        let mut by_end: Vec<usize> = (0..self.folds.len()).collect();
        by_end.sort_by_key(|&idx| (self.folds[idx].end, self.folds[idx].start));
        self.by_end = by_end;
        self.invalidate_top_level();
    }

    fn invalidate_top_level(&self) {
        self.top_level.borrow_mut().take();
    }

    /// Folds starting on `line`.
    pub fn get_folds_with_start_at(&self, line: usize) -> Vec<&Fold> {
        let first = self.folds.partition_point(|fold| fold.start.line < line);
        self.folds[first..]
            .iter()
            .take_while(|fold| fold.start.line == line)
            .collect()
    }

    /// Folds ending on `line`.
    pub fn get_folds_with_end_at(&self, line: usize) -> Vec<&Fold> {
        let first = self
            .by_end
            .partition_point(|&idx| self.folds[idx].end.line < line);
        self.by_end[first..]
            .iter()
            .map(|&idx| &self.folds[idx])
            .take_while(|fold| fold.end.line == line)
            .collect()
    }

    /// Folded folds starting on `line`.
    pub fn get_folded_folds_with_start_at(&self, line: usize) -> Vec<&Fold> {
        self.get_folds_with_start_at(line)
            .into_iter()
            .filter(|fold| fold.is_folded)
            .collect()
    }

    /// Folded folds starting on `line` after `column`.
    pub fn get_folded_folds_with_start_after_column(&self, line: usize, column: usize) -> Vec<&Fold> {
        self.get_folds_with_start_at(line)
            .into_iter()
            .filter(|fold| fold.is_folded && fold.start.column > column)
            .collect()
    }

    /// Folded folds ending on `line`.
    pub fn get_folded_folds_with_end_at(&self, line: usize) -> Vec<&Fold> {
        self.get_folds_with_end_at(line)
            .into_iter()
            .filter(|fold| fold.is_folded)
            .collect()
    }

    /// Returns `true` if a fold starts on `line`.
    pub fn is_fold_start(&self, line: usize) -> bool {
        !self.get_folds_with_start_at(line).is_empty()
    }

    /// Returns `true` if a fold ends on `line`.
    pub fn is_fold_end(&self, line: usize) -> bool {
        !self.get_folds_with_end_at(line).is_empty()
    }

    /// Folds whose first and last lines are both strictly outside `line`.
    pub fn get_folds_containing_line(&self, line: usize) -> Vec<&Fold> {
        self.folds
            .iter()
            .take_while(|fold| fold.start.line < line)
            .filter(|fold| line < fold.end.line)
            .collect()
    }

    /// Returns `true` if some fold strictly contains `line`.
    pub fn is_line_in_folds(&self, line: usize) -> bool {
        !self.get_folds_containing_line(line).is_empty()
    }

    /// Folds covering the position `(line, column)`, boundaries excluded.
    pub fn get_folds_from_position(&self, line: usize, column: usize) -> Vec<&Fold> {
        self.folds
            .iter()
            .take_while(|fold| fold.start.line <= line)
            .filter(|fold| {
                let (start, end) = (fold.start, fold.end);
                (start.line == line
                    && column > start.column
                    && !(end.line == line && column >= end.column))
                    || (end.line == line
                        && column < end.column
                        && !(start.line == line && column <= start.column))
                    || (start.line < line && line < end.line)
            })
            .collect()
    }

    /// Returns `true` unless `line` is hidden inside a folded region.
    pub fn is_line_visible(&self, line: usize) -> bool {
        !self
            .get_folds_containing_line(line)
            .iter()
            .any(|fold| fold.is_folded)
    }

    /// Folded folds not contained in another folded fold, in document order.
    pub fn get_top_level_folded_folds(&self) -> Vec<&Fold> {
        self.with_top_level(|indices| indices.iter().map(|&idx| &self.folds[idx]).collect())
    }

    fn with_top_level<R>(&self, f: impl FnOnce(&[usize]) -> R) -> R {
        let mut cache = self.top_level.borrow_mut();
        let indices = cache.get_or_insert_with(|| {
            let mut indices = Vec::new();
            let mut end = TextLocation::zero();
            for (idx, fold) in self.folds.iter().enumerate() {
                if fold.is_folded && (indices.is_empty() || fold.start >= end) {
                    indices.push(idx);
                    end = fold.end;
                }
            }
            indices
        });
        f(indices)
    }

    /// Visible row of a logical line.
    ///
    /// A line hidden inside a folded region maps to the row of the region's first line.
    pub fn get_visible_line(&self, logical_line: usize) -> usize {
        self.with_top_level(|indices| {
            let mut visible = 0;
            let mut fold_end = 0;
            for fold in indices.iter().map(|&idx| &self.folds[idx]) {
                if fold.start.line >= logical_line {
                    break;
                }
                if fold.start.line >= fold_end {
                    visible += fold.start.line - fold_end;
                    if fold.end.line > logical_line {
                        return visible;
                    }
                    fold_end = fold.end.line;
                }
            }
            visible + logical_line.saturating_sub(fold_end)
        })
    }

    /// First logical line shown on visible row `visible_line`.
    pub fn get_first_logical_line(&self, visible_line: usize) -> usize {
        self.with_top_level(|indices| {
            let mut visible = 0;
            let mut fold_end = 0;
            for fold in indices.iter().map(|&idx| &self.folds[idx]) {
                if fold.start.line >= fold_end {
                    if visible + fold.start.line - fold_end >= visible_line {
                        break;
                    }
                    visible += fold.start.line - fold_end;
                    fold_end = fold.end.line;
                }
            }
            fold_end + visible_line - visible
        })
    }

    /// Last logical line shown on visible row `visible_line`.
    pub fn get_last_logical_line(&self, visible_line: usize) -> usize {
        self.get_first_logical_line(visible_line + 1).saturating_sub(1)
    }

    /// Number of visible rows for a document of `total_lines` lines.
    pub fn total_visible_lines(&self, total_lines: usize) -> usize {
        self.get_visible_line(total_lines)
    }

    /// The line `count` visible lines below `line`, clamped to the last line.
    pub fn get_next_visible_line_after(&self, line: usize, count: usize, total_lines: usize) -> usize {
        let mut current = line;
        for _ in 0..count {
            if current + 1 >= total_lines {
                break;
            }
            current += 1;
            while current + 1 < total_lines && !self.is_line_visible(current) {
                current += 1;
            }
        }
        current.min(total_lines.saturating_sub(1))
    }

    /// The line `count` visible lines above `line`, clamped to line 0.
    pub fn get_next_visible_line_before(&self, line: usize, count: usize) -> usize {
        let mut current = line;
        for _ in 0..count {
            if current == 0 {
                break;
            }
            current -= 1;
            while current > 0 && !self.is_line_visible(current) {
                current -= 1;
            }
        }
        current
    }
}

fn validate_nesting(folds: &[Fold]) -> Result<()> {
    let mut open: Vec<&Fold> = Vec::new();
    for fold in folds {
        if fold.length == 0 {
            return Err(DocumentError::malformed(format!(
                "fold at offset {} is empty",
                fold.offset
            )));
        }
        while open
            .last()
            .is_some_and(|outer| outer.end_offset() <= fold.offset)
        {
            open.pop();
        }
        if let Some(outer) = open.last()
            && !outer.contains(fold)
        {
            return Err(DocumentError::malformed(format!(
                "fold {}..{} partially overlaps {}..{}",
                fold.offset,
                fold.end_offset(),
                outer.offset,
                outer.end_offset()
            )));
        }
        open.push(fold);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(count: usize) -> TextBuffer {
        let text = (0..count)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        TextBuffer::from_text(&text)
    }

    fn fold(buffer: &TextBuffer, start: (usize, usize), end: (usize, usize), folded: bool) -> Fold {
        Fold::from_locations(
            buffer,
            TextLocation::new(start.0, start.1),
            TextLocation::new(end.0, end.1),
            "",
            folded,
        )
    }

    #[test]
    fn test_fold_text_defaults_and_clamping() {
        let buffer = numbered_lines(3);
        let f = fold(&buffer, (0, 100), (9, 2), false);
        assert_eq!(f.fold_text(), DEFAULT_FOLD_TEXT);
        assert_eq!(f.start(), TextLocation::new(0, 6));
        assert_eq!(f.end(), TextLocation::new(2, 2));
        assert_eq!(f.offset(), 6);
        assert_eq!(f.end_offset(), 16);
    }

    #[test]
    fn test_partial_overlap_is_rejected() {
        let buffer = numbered_lines(10);
        let mut manager = FoldingManager::new();
        let err = manager
            .update_folds(vec![
                fold(&buffer, (1, 0), (5, 0), false),
                fold(&buffer, (3, 0), (7, 0), false),
            ])
            .unwrap_err();
        assert!(matches!(err, crate::DocumentError::MalformedFoldSet { .. }));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_folded_state_is_preserved_by_segment() {
        let buffer = numbered_lines(10);
        let mut manager = FoldingManager::new();
        manager
            .update_folds(vec![
                fold(&buffer, (1, 0), (8, 0), false),
                fold(&buffer, (2, 0), (4, 0), true),
            ])
            .unwrap();
        manager
            .update_folds(vec![
                fold(&buffer, (2, 0), (4, 0), false),
                fold(&buffer, (5, 0), (6, 0), true),
            ])
            .unwrap();
        let states: Vec<_> = manager.folds().iter().map(Fold::is_folded).collect();
        assert_eq!(states, vec![true, true]);
    }

    #[test]
    fn test_line_queries() {
        let buffer = numbered_lines(12);
        let mut manager = FoldingManager::new();
        manager
            .update_folds(vec![
                fold(&buffer, (1, 3), (9, 2), false),
                fold(&buffer, (2, 0), (4, 1), true),
                fold(&buffer, (4, 4), (6, 0), false),
            ])
            .unwrap();
        assert_eq!(manager.get_folds_with_start_at(2).len(), 1);
        assert_eq!(manager.get_folds_with_end_at(4).len(), 1);
        assert!(manager.is_fold_start(4));
        assert!(manager.is_fold_end(9));
        assert!(!manager.is_fold_end(5));
        assert_eq!(manager.get_folds_containing_line(3).len(), 2);
        assert_eq!(manager.get_folded_folds_with_end_at(4).len(), 1);
        assert_eq!(manager.get_folded_folds_with_start_after_column(4, 4).len(), 0);
        assert_eq!(manager.get_folds_from_position(1, 3).len(), 0);
        assert_eq!(manager.get_folds_from_position(1, 4).len(), 1);
        assert_eq!(manager.get_folds_from_position(9, 1).len(), 1);
        assert!(!manager.is_line_visible(3));
        assert!(manager.is_line_visible(4));
    }

    #[test]
    fn test_visible_line_mapping() {
        let buffer = numbered_lines(20);
        let mut manager = FoldingManager::new();
        manager
            .update_folds(vec![fold(&buffer, (5, 0), (10, 0), false)])
            .unwrap();
        assert_eq!(manager.get_visible_line(11), 11);
        manager.set_folded(0, true);
        assert_eq!(manager.get_visible_line(11), 6);
        assert_eq!(manager.get_visible_line(7), 5);
        assert_eq!(manager.get_visible_line(10), 5);
        assert_eq!(manager.get_first_logical_line(5), 5);
        assert_eq!(manager.get_first_logical_line(6), 11);
        assert_eq!(manager.get_last_logical_line(5), 10);
        assert_eq!(manager.total_visible_lines(20), 15);
        assert_eq!(manager.get_next_visible_line_after(5, 1, 20), 10);
        assert_eq!(manager.get_next_visible_line_before(11, 2), 5);
    }

    #[test]
    fn test_nested_folded_regions_use_the_outer_one() {
        let buffer = numbered_lines(20);
        let mut manager = FoldingManager::new();
        manager
            .update_folds(vec![
                fold(&buffer, (2, 0), (12, 0), true),
                fold(&buffer, (2, 0), (5, 0), true),
                fold(&buffer, (14, 0), (16, 0), true),
            ])
            .unwrap();
        let top: Vec<_> = manager
            .get_top_level_folded_folds()
            .iter()
            .map(|f| (f.start_line(), f.end_line()))
            .collect();
        assert_eq!(top, vec![(2, 12), (14, 16)]);
        assert_eq!(manager.get_visible_line(13), 3);
        assert_eq!(manager.get_visible_line(19), 7);
    }

    #[test]
    fn test_edit_shifts_and_drops_folds() {
        let mut buffer = numbered_lines(6);
        let mut manager = FoldingManager::new();
        manager
            .update_folds(vec![
                fold(&buffer, (1, 0), (3, 0), true),
                fold(&buffer, (4, 1), (4, 3), false),
            ])
            .unwrap();

        let removed = buffer.replace(0, 0, "new\n").unwrap();
        let change = DocumentChange::new(0, removed, "new\n");
        assert!(!manager.apply_change(&change, &buffer));
        assert_eq!(manager.folds()[0].start_line(), 2);
        assert_eq!(manager.folds()[0].end_line(), 4);

        let second = manager.folds()[1].clone();
        let removed = buffer.remove(second.offset(), second.length()).unwrap();
        let change = DocumentChange::new(second.offset(), removed, "");
        assert!(manager.apply_change(&change, &buffer));
        assert_eq!(manager.len(), 1);
    }
}
