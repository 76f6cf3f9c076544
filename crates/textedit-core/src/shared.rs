//! Cross-thread access to a document.
//!
//! A [`Document`] is `Send` but is mutated through `&mut`, so a single owner never races. When
//! several threads need the same document, [`SharedDocument`] hands it out one caller at a time
//! and reports contention as [`DocumentError::ConcurrentModification`] instead of blocking.

use crate::document::Document;
use crate::error::{DocumentError, Result};
use std::sync::{Arc, Mutex, TryLockError};
use tracing::warn;

/// A cloneable handle to a document shared between threads.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    /// Share `document`.
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Run `f` with exclusive access, failing if another caller holds the document.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Document) -> Result<R>) -> Result<R> {
        match self.inner.try_lock() {
            Ok(mut document) => f(&mut document),
            Err(TryLockError::WouldBlock) => {
                warn!(target: "document.buffer", "concurrent_modification");
                Err(DocumentError::ConcurrentModification)
            }
            // A panic inside `f` may have left the document half-edited.
            Err(TryLockError::Poisoned(_)) => Err(DocumentError::ConcurrentModification),
        }
    }

    /// Run `f` with shared access, failing if another caller holds the document.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        self.edit(|document| Ok(f(document)))
    }

    /// Number of handles to this document.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
