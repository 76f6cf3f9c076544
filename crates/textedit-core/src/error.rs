//! Error types shared by every document component.

use thiserror::Error;

/// Errors produced by document mutations and queries.
///
/// A call that returns an error leaves the buffer, the line index and the undo stack exactly
/// as they were before the call.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// An offset/length pair does not lie inside `[0, text_length]`.
    #[error("range {offset}+{length} is outside the document (length {text_length})")]
    OutOfRange {
        /// Requested start offset.
        offset: usize,
        /// Requested length.
        length: usize,
        /// Document length at the time of the call.
        text_length: usize,
    },

    /// A line number is not smaller than the line count.
    #[error("line {line} is outside the document ({line_count} lines)")]
    LineOutOfRange {
        /// Requested line.
        line: usize,
        /// Line count at the time of the call.
        line_count: usize,
    },

    /// The document is read-only.
    #[error("document is read-only")]
    ReadOnly,

    /// The range touches text protected by a read-only marker.
    #[error("range {offset}+{length} is protected by a read-only marker")]
    ReadOnlySegment {
        /// Start offset of the refused range.
        offset: usize,
        /// Length of the refused range.
        length: usize,
    },

    /// Another caller holds the document.
    #[error("document is being modified by another caller")]
    ConcurrentModification,

    /// A fold set from a folding strategy violates strict nesting.
    #[error("malformed fold set: {reason}")]
    MalformedFoldSet {
        /// What was wrong with the fold set.
        reason: String,
    },

    /// `end_undo_group` was called without a matching `start_undo_group`.
    #[error("end_undo_group called without an open undo group")]
    NoOpenUndoGroup,

    /// I/O failure while loading or saving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input bytes are not valid in the detected encoding.
    #[error("input is not valid {encoding}")]
    InvalidEncoding {
        /// Name of the encoding that failed to decode.
        encoding: &'static str,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, DocumentError>;

impl DocumentError {
    pub(crate) fn out_of_range(offset: usize, length: usize, text_length: usize) -> Self {
        Self::OutOfRange {
            offset,
            length,
            text_length,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFoldSet {
            reason: reason.into(),
        }
    }
}
