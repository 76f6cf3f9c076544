//! Stage 3: Undo Stack
//!
//! Linear undo/redo history of reversible edit operations.
//!
//! - Operations recorded while an undo group is open form one unit. Groups nest through a depth
//!   counter; only the outermost `start`/`end` pair delimits the unit.
//! - A unit is undone by applying the inverse of each operation, newest first, and redone in
//!   the original order.
//! - Recording a new operation clears the redo history.
//!
//! The stack does not own the text. It applies operations through an [`UndoTarget`], which is
//! how the document replays edits without recording them again.

use crate::delta::DocumentChange;
use crate::error::{DocumentError, Result};
use tracing::{debug, trace, warn};

/// Something an undo stack can replay edits on.
pub trait UndoTarget {
    /// Replace `length` characters at `offset` with `text`.
    fn replace_for_undo(&mut self, offset: usize, length: usize, text: &str) -> Result<()>;
}

impl UndoTarget for String {
    fn replace_for_undo(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        let text_length = self.chars().count();
        if offset + length > text_length {
            return Err(DocumentError::out_of_range(offset, length, text_length));
        }
        let start = crate::text::byte_index(self, offset);
        let end = crate::text::byte_index(self, offset + length);
        self.replace_range(start..end, text);
        Ok(())
    }
}

/// A single reversible edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoableOperation {
    /// `text` was inserted at `offset`.
    Insert {
        /// Insertion offset.
        offset: usize,
        /// Inserted text.
        text: String,
    },
    /// `text` was removed at `offset`.
    Remove {
        /// Removal offset.
        offset: usize,
        /// Removed text.
        text: String,
    },
    /// `removed` was replaced by `inserted` at `offset`.
    Replace {
        /// Edit offset.
        offset: usize,
        /// Text that was there before.
        removed: String,
        /// Text that replaced it.
        inserted: String,
    },
}

impl UndoableOperation {
    /// Classify a document change.
    pub fn from_change(change: &DocumentChange) -> Self {
        let offset = change.offset;
        match (change.removed_text.is_empty(), change.inserted_text.is_empty()) {
            (true, _) => Self::Insert {
                offset,
                text: change.inserted_text.clone(),
            },
            (false, true) => Self::Remove {
                offset,
                text: change.removed_text.clone(),
            },
            (false, false) => Self::Replace {
                offset,
                removed: change.removed_text.clone(),
                inserted: change.inserted_text.clone(),
            },
        }
    }

    fn undo(&self, target: &mut dyn UndoTarget) -> Result<()> {
        match self {
            Self::Insert { offset, text } => {
                target.replace_for_undo(*offset, text.chars().count(), "")
            }
            Self::Remove { offset, text } => target.replace_for_undo(*offset, 0, text),
            Self::Replace {
                offset,
                removed,
                inserted,
            } => target.replace_for_undo(*offset, inserted.chars().count(), removed),
        }
    }

    fn redo(&self, target: &mut dyn UndoTarget) -> Result<()> {
        match self {
            Self::Insert { offset, text } => target.replace_for_undo(*offset, 0, text),
            Self::Remove { offset, text } => {
                target.replace_for_undo(*offset, text.chars().count(), "")
            }
            Self::Replace {
                offset,
                removed,
                inserted,
            } => target.replace_for_undo(*offset, removed.chars().count(), inserted),
        }
    }
}

/// One entry of the undo or redo history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoUnit {
    /// A lone operation.
    Single(UndoableOperation),
    /// Operations recorded inside one undo group, oldest first.
    Group(Vec<UndoableOperation>),
}

impl UndoUnit {
    fn operations(&self) -> &[UndoableOperation] {
        match self {
            Self::Single(op) => std::slice::from_ref(op),
            Self::Group(ops) => ops,
        }
    }

    fn undo(&self, target: &mut dyn UndoTarget) -> Result<()> {
        let ops = self.operations();
        for (done, op) in ops.iter().rev().enumerate() {
            if let Err(err) = op.undo(target) {
                // Put back what was already reverted.
                for op in ops.iter().rev().take(done).rev() {
                    if let Err(rollback) = op.redo(target) {
                        warn!(target: "document.undo", error = %rollback, ?op, "undo_rollback_failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn redo(&self, target: &mut dyn UndoTarget) -> Result<()> {
        let ops = self.operations();
        for (done, op) in ops.iter().enumerate() {
            if let Err(err) = op.redo(target) {
                for op in ops.iter().take(done).rev() {
                    if let Err(rollback) = op.undo(target) {
                        warn!(target: "document.undo", error = %rollback, ?op, "redo_rollback_failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Undo/redo history with nested grouping.
#[derive(Debug)]
pub struct UndoStack {
    undo: Vec<UndoUnit>,
    redo: Vec<UndoUnit>,
    group_depth: usize,
    actions_in_group: usize,
    accept_changes: bool,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    /// Create an empty stack that records operations.
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            group_depth: 0,
            actions_in_group: 0,
            accept_changes: true,
        }
    }

    /// Whether [`push`](Self::push) records operations.
    pub fn accept_changes(&self) -> bool {
        self.accept_changes
    }

    /// Enable or disable recording.
    pub fn set_accept_changes(&mut self, accept: bool) {
        self.accept_changes = accept;
    }

    /// Returns `true` if there is something to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Returns `true` if there is something to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable units.
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    /// Number of redoable units.
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    /// Current group nesting depth.
    pub fn group_depth(&self) -> usize {
        self.group_depth
    }

    /// Open a (possibly nested) undo group.
    pub fn start_undo_group(&mut self) {
        if self.group_depth == 0 {
            self.actions_in_group = 0;
        }
        self.group_depth += 1;
        debug!(target: "document.undo", depth = self.group_depth, "start_undo_group");
    }

    /// Close the innermost undo group. Closing the outermost one folds the operations recorded
    /// since it was opened into a single unit.
    pub fn end_undo_group(&mut self) -> Result<()> {
        if self.group_depth == 0 {
            return Err(DocumentError::NoOpenUndoGroup);
        }
        self.group_depth -= 1;
        if self.group_depth == 0 && self.actions_in_group > 1 {
            let split_at = self.undo.len().saturating_sub(self.actions_in_group);
            let ops = self
                .undo
                .split_off(split_at)
                .into_iter()
                .flat_map(|unit| match unit {
                    UndoUnit::Single(op) => vec![op],
                    UndoUnit::Group(ops) => ops,
                })
                .collect();
            self.undo.push(UndoUnit::Group(ops));
        }
        debug!(
            target: "document.undo",
            depth = self.group_depth,
            actions = self.actions_in_group,
            "end_undo_group"
        );
        Ok(())
    }

    /// Record an operation. Clears the redo history.
    pub fn push(&mut self, operation: UndoableOperation) {
        if !self.accept_changes {
            return;
        }
        self.undo.push(UndoUnit::Single(operation));
        self.actions_in_group += 1;
        if !self.redo.is_empty() {
            trace!(target: "document.undo", dropped = self.redo.len(), "redo_cleared_on_push");
            self.redo.clear();
        }
        trace!(target: "document.undo", undo_depth = self.undo.len(), "operation_pushed");
    }

    /// Undo the most recent unit. Returns `false` when there was nothing to undo.
    ///
    /// If replaying fails the target is restored and the unit stays on the undo stack.
    pub fn undo(&mut self, target: &mut dyn UndoTarget) -> Result<bool> {
        if self.group_depth > 0 {
            warn!(target: "document.undo", depth = self.group_depth, "undo_inside_open_group_ignored");
            return Ok(false);
        }
        let Some(unit) = self.undo.pop() else {
            return Ok(false);
        };
        let accept = std::mem::replace(&mut self.accept_changes, false);
        let result = unit.undo(target);
        self.accept_changes = accept;
        match result {
            Ok(()) => {
                self.redo.push(unit);
                trace!(target: "document.undo", undo_depth = self.undo.len(), redo_depth = self.redo.len(), "action_undone");
                Ok(true)
            }
            Err(err) => {
                self.undo.push(unit);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone unit. Returns `false` when there was nothing to redo.
    pub fn redo(&mut self, target: &mut dyn UndoTarget) -> Result<bool> {
        if self.group_depth > 0 {
            warn!(target: "document.undo", depth = self.group_depth, "redo_inside_open_group_ignored");
            return Ok(false);
        }
        let Some(unit) = self.redo.pop() else {
            return Ok(false);
        };
        let accept = std::mem::replace(&mut self.accept_changes, false);
        let result = unit.redo(target);
        self.accept_changes = accept;
        match result {
            Ok(()) => {
                self.undo.push(unit);
                trace!(target: "document.undo", undo_depth = self.undo.len(), redo_depth = self.redo.len(), "action_redone");
                Ok(true)
            }
            Err(err) => {
                self.redo.push(unit);
                Err(err)
            }
        }
    }

    /// Drop the redo history.
    pub fn clear_redo(&mut self) {
        self.redo.clear();
    }

    /// Drop both histories.
    pub fn clear_all(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.actions_in_group = 0;
    }
}
