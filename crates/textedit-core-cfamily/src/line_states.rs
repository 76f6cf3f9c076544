//! End-of-line lexer states, cached per line.
//!
//! Enter handling asks how the previous line ended (inside a block comment, a string, ...).
//! [`LineStateCache`] remembers the answer for a prefix of the document's lines and resumes
//! lexing from the last remembered line, so a keystroke only lexes the lines that changed.
//! [`LineStateCache::track`] keeps the cache in step with a document's edits.

use crate::scanner::{CodeScanner, LexState};
use std::sync::{Arc, Mutex, PoisonError};
use textedit_core::{Document, DocumentChange, DocumentEvent, Result, SubscriptionId};
use tracing::trace;

/// Lexer state at the end of each of the first [`len`](Self::len) lines of a document.
#[derive(Debug, Clone)]
pub struct LineStateCache {
    verbatim_prefix: Option<char>,
    /// End offset (before the delimiter) and end state, one entry per line from line 0.
    ends: Vec<(usize, LexState)>,
}

impl LineStateCache {
    /// An empty cache for a language whose verbatim strings start with `verbatim_prefix`.
    pub fn new(verbatim_prefix: Option<char>) -> Self {
        Self {
            verbatim_prefix,
            ends: Vec::new(),
        }
    }

    /// Number of lines with a cached state.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns `true` if no line has a cached state.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Forget every line.
    pub fn clear(&mut self) {
        self.ends.clear();
    }

    /// Forget every line whose text `change` may have touched, and all lines after it.
    pub fn invalidate(&mut self, change: &DocumentChange) {
        let keep = self.ends.partition_point(|&(end, _)| end < change.offset);
        self.ends.truncate(keep);
    }

    /// Lexer state at the end of `line`, before its delimiter.
    pub fn line_end_state(&mut self, document: &Document, line: usize) -> Result<LexState> {
        document.line_segment(line)?;
        if let Some(&(_, state)) = self.ends.get(line) {
            return Ok(state);
        }
        let mut scanner = CodeScanner::new(self.verbatim_prefix);
        if let Some(&(_, state)) = self.ends.last() {
            scanner.resume(state);
        }
        trace!(target: "format.indent", from = self.ends.len(), to = line, "line_states_lexed");
        for current in self.ends.len()..=line {
            scanner.start_line();
            let segment = document.line_segment(current)?;
            let mut chars = document.chars_from(segment.offset)?.take(segment.length).peekable();
            while let Some(ch) = chars.next() {
                scanner.advance(ch, chars.peek().copied());
            }
            self.ends.push((segment.end_offset(), scanner.state()));
        }
        Ok(scanner.state())
    }

    /// Invalidate `cache` whenever `document` changes.
    pub fn track(cache: &Arc<Mutex<Self>>, document: &mut Document) -> SubscriptionId {
        let cache = Arc::clone(cache);
        document.subscribe(move |event| {
            let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
            match event {
                DocumentEvent::Changed(change) => cache.invalidate(change),
                DocumentEvent::TextContentChanged => cache.clear(),
                _ => {}
            }
        })
    }
}
