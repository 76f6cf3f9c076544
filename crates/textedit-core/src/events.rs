//! Document notifications and the update queue.
//!
//! Observers register callbacks with [`Document::subscribe`](crate::Document::subscribe).
//! Text changes are delivered synchronously, before and after each edit. View invalidation is
//! expressed as [`UpdateRequest`]s that are queued and delivered together as one
//! [`DocumentEvent::UpdateCommitted`]; inside a batch (see
//! [`Document::begin_update`](crate::Document::begin_update)) the queue is only flushed when the
//! outermost batch ends.

use crate::delta::DocumentChange;
use crate::location::TextLocation;

/// A notification emitted by a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// An edit is about to be applied. `removed_text` still holds the current text.
    AboutToChange(DocumentChange),
    /// An edit has been applied and every dependent model has been updated.
    Changed(DocumentChange),
    /// The whole content was replaced.
    TextContentChanged,
    /// Fold state or the fold set changed.
    FoldingChanged,
    /// Queued view updates, coalesced.
    UpdateCommitted(Vec<UpdateRequest>),
}

/// A region of the view that needs to be redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRequest {
    /// Everything.
    WholeTextArea,
    /// One line.
    SingleLine(usize),
    /// Lines `first..=last`.
    LinesBetween(usize, usize),
    /// From a location to the end of the document.
    PositionToEnd(TextLocation),
    /// From a location to the end of its line.
    PositionToLineEnd(TextLocation),
}

impl UpdateRequest {
    /// Returns `true` if `self` already covers `other`.
    pub fn covers(&self, other: &UpdateRequest) -> bool {
        use UpdateRequest::*;
        match (*self, *other) {
            (WholeTextArea, _) => true,
            (_, WholeTextArea) => false,
            (a, b) if a == b => true,
            (PositionToEnd(from), SingleLine(line) | LinesBetween(line, _)) => {
                from.line < line || (from.line == line && from.column == 0)
            }
            (PositionToEnd(from), PositionToEnd(loc) | PositionToLineEnd(loc)) => from <= loc,
            (LinesBetween(first, last), SingleLine(line)) => first <= line && line <= last,
            (LinesBetween(first, last), LinesBetween(a, b)) => first <= a && b <= last,
            (LinesBetween(first, last), PositionToLineEnd(loc)) => {
                first <= loc.line && loc.line <= last
            }
            (SingleLine(line), PositionToLineEnd(loc)) => line == loc.line,
            _ => false,
        }
    }
}

/// Pending view updates.
#[derive(Debug, Default)]
pub(crate) struct UpdateQueue {
    requests: Vec<UpdateRequest>,
}

impl UpdateQueue {
    /// Queue `request` unless an existing entry already covers it; drop entries it covers.
    pub(crate) fn push(&mut self, request: UpdateRequest) {
        if self.requests.iter().any(|queued| queued.covers(&request)) {
            return;
        }
        self.requests.retain(|queued| !request.covers(queued));
        self.requests.push(request);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<UpdateRequest> {
        std::mem::take(&mut self.requests)
    }
}

/// Handle returned by [`Document::subscribe`](crate::Document::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Callback type for document notifications.
pub type DocumentCallback = Box<dyn FnMut(&DocumentEvent) + Send>;
