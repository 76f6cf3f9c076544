//! Stage 5: Document
//!
//! [`Document`] owns the buffer and every model layered on it and is the only way to mutate
//! them, so each edit runs the same pipeline:
//!
//! 1. validate (range, read-only flag, read-only markers)
//! 2. notify [`DocumentEvent::AboutToChange`]
//! 3. mutate the buffer and its line index
//! 4. shift folds, markers and selections
//! 5. notify [`DocumentEvent::Changed`] and queue a view update
//! 6. record the undo operation
//!
//! The undo stack lives beside a core holding everything else. The core is the [`UndoTarget`]
//! that undo and redo replay onto, so replayed edits go through steps 2 to 5 without being
//! recorded again.

use crate::buffer::TextBuffer;
use crate::config::EditorProperties;
use crate::delta::DocumentChange;
use crate::error::{DocumentError, Result};
use crate::events::{DocumentCallback, DocumentEvent, SubscriptionId, UpdateQueue, UpdateRequest};
use crate::folding::{Fold, FoldingManager, FoldingStrategy};
use crate::formatting::{DefaultFormattingStrategy, FormattingStrategy};
use crate::line_index::LineSegment;
use crate::location::TextLocation;
use crate::markers::MarkerStrategy;
use crate::selection::{Selection, SelectionManager};
use crate::undo::{UndoStack, UndoTarget, UndoableOperation};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Everything a document owns except its undo history.
pub(crate) struct DocumentCore {
    buffer: TextBuffer,
    folding: FoldingManager,
    markers: MarkerStrategy,
    selection: SelectionManager,
    properties: EditorProperties,
    read_only: bool,
    listeners: Vec<(SubscriptionId, DocumentCallback)>,
    next_subscription: u64,
    updates: UpdateQueue,
    update_depth: usize,
}

impl DocumentCore {
    fn new(buffer: TextBuffer) -> Self {
        Self {
            buffer,
            folding: FoldingManager::new(),
            markers: MarkerStrategy::new(),
            selection: SelectionManager::new(),
            properties: EditorProperties::default(),
            read_only: false,
            listeners: Vec::new(),
            next_subscription: 0,
            updates: UpdateQueue::default(),
            update_depth: 0,
        }
    }

    fn emit(&mut self, event: &DocumentEvent) {
        for (_, callback) in &mut self.listeners {
            callback(event);
        }
    }

    fn request_update(&mut self, request: UpdateRequest) {
        self.updates.push(request);
    }

    fn commit_update(&mut self) {
        if self.update_depth > 0 || self.updates.is_empty() {
            return;
        }
        let requests = self.updates.take();
        trace!(target: "document.update", count = requests.len(), "update_committed");
        self.emit(&DocumentEvent::UpdateCommitted(requests));
    }

    fn begin_update(&mut self) {
        self.update_depth += 1;
        debug!(target: "document.update", depth = self.update_depth, "begin_update");
    }

    fn end_update(&mut self) {
        if self.update_depth == 0 {
            warn!(target: "document.update", "end_update_without_begin");
            return;
        }
        self.update_depth -= 1;
        debug!(target: "document.update", depth = self.update_depth, "end_update");
        self.commit_update();
    }

    /// Apply one edit to the buffer and every dependent model. Does not touch the undo stack.
    fn apply(&mut self, offset: usize, length: usize, text: &str) -> Result<DocumentChange> {
        let removed = self.buffer.get_text(offset, length)?;
        let change = DocumentChange::new(offset, removed, text);
        let start = self.buffer.offset_to_position(offset)?;
        let old_line_count = self.buffer.line_count();

        self.emit(&DocumentEvent::AboutToChange(change.clone()));
        self.buffer.replace(offset, length, text)?;

        let folds_dropped = self.folding.apply_change(&change, &self.buffer);
        self.markers.apply_change(&change);
        self.selection.apply_change(&change);

        let single_line = self.buffer.line_count() == old_line_count
            && !change.removed_text.contains(['\n', '\r'])
            && !change.inserted_text.contains(['\n', '\r']);
        self.request_update(if single_line {
            UpdateRequest::SingleLine(start.line)
        } else {
            UpdateRequest::PositionToEnd(start)
        });
        trace!(
            target: "document.buffer",
            offset,
            removed = length,
            inserted = change.inserted_len(),
            lines = self.buffer.line_count(),
            "edit_applied"
        );

        self.emit(&DocumentEvent::Changed(change.clone()));
        if folds_dropped {
            self.emit(&DocumentEvent::FoldingChanged);
        }
        self.commit_update();
        Ok(change)
    }
}

impl UndoTarget for DocumentCore {
    fn replace_for_undo(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        self.apply(offset, length, text).map(|_| ())
    }
}

/// A text document with undo, folding, markers, selections and pluggable strategies.
pub struct Document {
    undo: UndoStack,
    core: DocumentCore,
    formatting: Arc<dyn FormattingStrategy>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("text_length", &self.text_length())
            .field("line_count", &self.line_count())
            .field("read_only", &self.core.read_only)
            .field("undo_count", &self.undo.undo_count())
            .field("folds", &self.core.folding.len())
            .finish()
    }
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self::with_buffer(TextBuffer::new())
    }

    /// A document holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self::with_buffer(TextBuffer::from_text(text))
    }

    fn with_buffer(buffer: TextBuffer) -> Self {
        Self {
            undo: UndoStack::new(),
            core: DocumentCore::new(buffer),
            formatting: Arc::new(DefaultFormattingStrategy),
        }
    }

    // ----- text queries -----

    /// The underlying buffer.
    pub fn buffer(&self) -> &TextBuffer {
        &self.core.buffer
    }

    /// Number of characters.
    pub fn text_length(&self) -> usize {
        self.core.buffer.len()
    }

    /// The whole content.
    pub fn text(&self) -> String {
        self.core.buffer.text()
    }

    /// Character at `offset`.
    pub fn char_at(&self, offset: usize) -> Result<char> {
        self.core.buffer.char_at(offset)
    }

    /// Characters starting at `offset`.
    pub fn chars_from(&self, offset: usize) -> Result<ropey::iter::Chars<'_>> {
        self.core.buffer.chars_from(offset)
    }

    /// `length` characters at `offset`.
    pub fn get_text(&self, offset: usize, length: usize) -> Result<String> {
        self.core.buffer.get_text(offset, length)
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.core.buffer.line_count()
    }

    /// Segment of `line`.
    pub fn line_segment(&self, line: usize) -> Result<LineSegment> {
        self.core.buffer.line_segment(line)
    }

    /// Every line segment in order.
    pub fn line_segments(&self) -> impl Iterator<Item = LineSegment> + '_ {
        self.core.buffer.line_index().segments()
    }

    /// Line containing `offset`.
    pub fn line_number_for_offset(&self, offset: usize) -> Result<usize> {
        self.core.buffer.line_number_for_offset(offset)
    }

    /// Segment of the line containing `offset`.
    pub fn line_segment_for_offset(&self, offset: usize) -> Result<LineSegment> {
        self.core.buffer.line_segment_for_offset(offset)
    }

    /// Text of `line` without its delimiter.
    pub fn line_text(&self, line: usize) -> Result<String> {
        self.core.buffer.line_text(line)
    }

    /// Delimiter of `line`.
    pub fn line_delimiter(&self, line: usize) -> Result<String> {
        self.core.buffer.line_delimiter(line)
    }

    /// Location to offset, clamping the column.
    pub fn position_to_offset(&self, location: TextLocation) -> Result<usize> {
        self.core.buffer.position_to_offset(location)
    }

    /// Offset to location.
    pub fn offset_to_position(&self, offset: usize) -> Result<TextLocation> {
        self.core.buffer.offset_to_position(offset)
    }

    /// Clamp a location into the document, snapped to a grapheme boundary.
    pub fn validate(&self, location: TextLocation) -> TextLocation {
        self.core.buffer.validate(location)
    }

    // ----- editing -----

    /// Whether edits are refused.
    pub fn is_read_only(&self) -> bool {
        self.core.read_only
    }

    /// Refuse or allow edits.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.core.read_only = read_only;
    }

    fn check_writable(&self, offset: usize, length: usize) -> Result<()> {
        if self.core.read_only {
            warn!(target: "document.buffer", offset, length, "edit_refused_read_only");
            return Err(DocumentError::ReadOnly);
        }
        if self.core.markers.has_read_only_marker_in(offset, length) {
            warn!(target: "document.buffer", offset, length, "edit_refused_protected");
            return Err(DocumentError::ReadOnlySegment { offset, length });
        }
        Ok(())
    }

    /// Insert `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.replace(offset, 0, text)
    }

    /// Remove `length` characters at `offset`.
    pub fn remove(&mut self, offset: usize, length: usize) -> Result<()> {
        self.replace(offset, length, "")
    }

    /// Replace `length` characters at `offset` with `text`.
    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        self.check_writable(offset, length)?;
        if length == 0 && text.is_empty() {
            // Still reject a bad offset.
            self.core.buffer.get_text(offset, 0)?;
            return Ok(());
        }
        let change = self.core.apply(offset, length, text)?;
        self.undo.push(UndoableOperation::from_change(&change));
        Ok(())
    }

    /// Replace the whole content.
    ///
    /// Clears the undo history, folds, markers and selections.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if self.core.read_only {
            return Err(DocumentError::ReadOnly);
        }
        self.core.buffer.set_text(text);
        self.undo.clear_all();
        self.core.folding.clear();
        self.core.markers.clear();
        self.core.selection.clear();
        debug!(target: "document.buffer", length = self.text_length(), "text_content_replaced");
        self.core.emit(&DocumentEvent::TextContentChanged);
        self.core.request_update(UpdateRequest::WholeTextArea);
        self.core.commit_update();
        Ok(())
    }

    // ----- undo -----

    /// The undo history.
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// The undo history, mutably.
    pub fn undo_stack_mut(&mut self) -> &mut UndoStack {
        &mut self.undo
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Open an undo group.
    pub fn start_undo_group(&mut self) {
        self.undo.start_undo_group();
    }

    /// Close the innermost undo group.
    pub fn end_undo_group(&mut self) -> Result<()> {
        self.undo.end_undo_group()
    }

    /// Run `f` inside an undo group. The group is closed even when `f` fails.
    pub fn undo_group<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.undo.start_undo_group();
        let result = f(self);
        let closed = self.undo.end_undo_group();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Undo the last unit. Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        if self.core.read_only {
            return Err(DocumentError::ReadOnly);
        }
        self.core.begin_update();
        let result = self.undo.undo(&mut self.core);
        self.core.end_update();
        result
    }

    /// Redo the last undone unit. Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        if self.core.read_only {
            return Err(DocumentError::ReadOnly);
        }
        self.core.begin_update();
        let result = self.undo.redo(&mut self.core);
        self.core.end_update();
        result
    }

    // ----- events and batching -----

    /// Register a callback for every [`DocumentEvent`].
    pub fn subscribe(&mut self, callback: impl FnMut(&DocumentEvent) + Send + 'static) -> SubscriptionId {
        self.core.next_subscription += 1;
        let id = SubscriptionId(self.core.next_subscription);
        self.core.listeners.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.core.listeners.len();
        self.core.listeners.retain(|(listener, _)| *listener != id);
        before != self.core.listeners.len()
    }

    /// Queue a view update.
    pub fn request_update(&mut self, request: UpdateRequest) {
        self.core.request_update(request);
    }

    /// Deliver queued updates unless a batch is open.
    pub fn commit_update(&mut self) {
        self.core.commit_update();
    }

    /// Open a batch; updates are delivered when the outermost batch ends.
    pub fn begin_update(&mut self) {
        self.core.begin_update();
    }

    /// Close a batch.
    pub fn end_update(&mut self) {
        self.core.end_update();
    }

    /// Returns `true` while a batch is open.
    pub fn is_in_update(&self) -> bool {
        self.core.update_depth > 0
    }

    /// Open a batch that ends when the guard is dropped.
    pub fn batch(&mut self) -> UpdateBatch<'_> {
        self.begin_update();
        UpdateBatch { document: self }
    }

    // ----- properties and strategies -----

    /// Editor properties.
    pub fn properties(&self) -> &EditorProperties {
        &self.core.properties
    }

    /// Replace the editor properties.
    pub fn set_properties(&mut self, properties: EditorProperties) {
        self.core.properties = properties;
    }

    /// The formatting strategy.
    pub fn formatting_strategy(&self) -> Arc<dyn FormattingStrategy> {
        Arc::clone(&self.formatting)
    }

    /// Install a formatting strategy.
    pub fn set_formatting_strategy(&mut self, strategy: Arc<dyn FormattingStrategy>) {
        self.formatting = strategy;
    }

    /// Indent `line` with the formatting strategy. Returns the caret column.
    pub fn indent_line(&mut self, line: usize) -> Result<usize> {
        let strategy = self.formatting_strategy();
        strategy.indent_line(self, line)
    }

    /// Indent lines `begin..=end` with the formatting strategy.
    pub fn indent_lines(&mut self, begin: usize, end: usize) -> Result<()> {
        let strategy = self.formatting_strategy();
        strategy.indent_lines(self, begin, end)
    }

    /// Let the formatting strategy react to a typed character.
    pub fn format_line(&mut self, line: usize, caret_offset: usize, ch: char) -> Result<Option<usize>> {
        let strategy = self.formatting_strategy();
        strategy.format_line(self, line, caret_offset, ch)
    }

    /// Matching `close` bracket for an `open` bracket just before `offset`.
    pub fn search_bracket_forward(&self, offset: usize, open: char, close: char) -> Option<usize> {
        self.formatting.search_bracket_forward(self, offset, open, close)
    }

    /// Matching `open` bracket for a `close` bracket just after `offset`.
    pub fn search_bracket_backward(&self, offset: usize, open: char, close: char) -> Option<usize> {
        self.formatting.search_bracket_backward(self, offset, open, close)
    }

    // ----- folding -----

    /// The folds.
    pub fn folding(&self) -> &FoldingManager {
        &self.core.folding
    }

    /// Install or remove the folding strategy.
    pub fn set_folding_strategy(&mut self, strategy: Option<Arc<dyn FoldingStrategy>>) {
        self.core.folding.set_strategy(strategy);
    }

    /// Replace the fold set. See [`FoldingManager::update_folds`].
    pub fn update_folds(&mut self, folds: Vec<Fold>) -> Result<()> {
        self.core.folding.update_folds(folds)?;
        self.notify_folding_changed();
        Ok(())
    }

    /// Regenerate folds with the folding strategy.
    ///
    /// Does nothing when folding is disabled or no strategy is installed.
    pub fn update_folds_from_strategy(&mut self, file_name: Option<&str>) -> Result<()> {
        if !self.core.properties.enable_folding {
            return Ok(());
        }
        let Some(strategy) = self.core.folding.strategy() else {
            return Ok(());
        };
        let folds = strategy.generate_folds(self, file_name);
        debug!(target: "document.folding", generated = folds.len(), "folds_generated");
        self.update_folds(folds)
    }

    /// Fold or unfold the fold at `index`.
    pub fn set_folded(&mut self, index: usize, folded: bool) -> bool {
        let changed = self.core.folding.set_folded(index, folded);
        if changed {
            self.notify_folding_changed();
        }
        changed
    }

    /// Flip the fold at `index`.
    pub fn toggle_fold(&mut self, index: usize) -> bool {
        let changed = self.core.folding.toggle_fold(index);
        if changed {
            self.notify_folding_changed();
        }
        changed
    }

    /// Fold everything.
    pub fn fold_all(&mut self) {
        if self.core.folding.fold_all() {
            self.notify_folding_changed();
        }
    }

    /// Unfold everything.
    pub fn unfold_all(&mut self) {
        if self.core.folding.unfold_all() {
            self.notify_folding_changed();
        }
    }

    /// Tell observers the fold state changed.
    pub fn notify_folding_changed(&mut self) {
        self.core.emit(&DocumentEvent::FoldingChanged);
        self.core.request_update(UpdateRequest::WholeTextArea);
        self.core.commit_update();
    }

    // ----- markers -----

    /// The markers.
    pub fn markers(&self) -> &MarkerStrategy {
        &self.core.markers
    }

    /// The markers, mutably.
    pub fn markers_mut(&mut self) -> &mut MarkerStrategy {
        &mut self.core.markers
    }

    // ----- selection -----

    /// The selections.
    pub fn selection(&self) -> &SelectionManager {
        &self.core.selection
    }

    /// The selections, mutably. Changes made here queue no view update.
    pub fn selection_mut(&mut self) -> &mut SelectionManager {
        &mut self.core.selection
    }

    /// Select between two locations.
    pub fn set_selection(&mut self, start: TextLocation, end: TextLocation) -> Result<()> {
        let selection = Selection::from_locations(&self.core.buffer, start, end)?;
        if self.core.selection.set_selection(selection) {
            self.core.request_update(UpdateRequest::LinesBetween(
                start.line.min(end.line),
                start.line.max(end.line),
            ));
            self.core.commit_update();
        }
        Ok(())
    }

    /// Extend the selection as the caret moves from `old` to `new`.
    pub fn extend_selection(&mut self, old: TextLocation, new: TextLocation) -> Result<()> {
        let old = self.validate(old);
        let new = self.validate(new);
        if let Some((first, last)) = self.core.selection.extend_selection(&self.core.buffer, old, new)? {
            self.core.request_update(UpdateRequest::LinesBetween(first, last));
            self.core.commit_update();
        }
        Ok(())
    }

    /// Drop every selection.
    pub fn clear_selection(&mut self) {
        for selection in self.core.selection.clear() {
            if let (Ok(start), Ok(end)) = (
                selection.start_position(&self.core.buffer),
                selection.end_position(&self.core.buffer),
            ) {
                self.core
                    .request_update(UpdateRequest::LinesBetween(start.line, end.line));
            }
        }
        self.core.commit_update();
    }

    /// Text of every selection, concatenated.
    pub fn selected_text(&self) -> Result<String> {
        self.core.selection.selected_text(&self.core.buffer)
    }

    /// Returns `true` if the document is read-only or a selection touches protected text.
    pub fn selection_is_read_only(&self) -> bool {
        self.core.read_only || self.core.selection.intersects_read_only_marker(&self.core.markers)
    }

    /// Delete the selected text as one undo unit.
    ///
    /// A read-only selection is cleared without deleting anything. Returns `true` if text was
    /// removed.
    pub fn remove_selected_text(&mut self) -> Result<bool> {
        if self.selection_is_read_only() {
            self.clear_selection();
            return Ok(false);
        }
        let selections: Vec<Selection> = self.core.selection.selections().to_vec();
        if selections.iter().all(Selection::is_empty) {
            self.clear_selection();
            return Ok(false);
        }
        let mut batch = self.batch();
        batch.undo_group(|doc| {
            // Back to front so earlier offsets stay valid.
            for selection in selections.iter().rev() {
                doc.remove(selection.offset(), selection.length())?;
            }
            Ok(())
        })?;
        batch.clear_selection();
        Ok(true)
    }
}

/// An open update batch. Dereferences to the document; ends the batch on drop.
pub struct UpdateBatch<'a> {
    document: &'a mut Document,
}

impl Deref for UpdateBatch<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        self.document
    }
}

impl DerefMut for UpdateBatch<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        self.document
    }
}

impl Drop for UpdateBatch<'_> {
    fn drop(&mut self) {
        self.document.end_update();
    }
}
