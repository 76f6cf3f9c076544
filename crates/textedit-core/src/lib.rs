#![warn(missing_docs)]
//! Textedit Core - Headless Text Document Engine
//!
//! # Overview
//!
//! `textedit-core` is the document model behind a text editor: a line-indexed buffer, grouped
//! undo, folding, markers and selections, plus the hooks a language plugs its formatting and
//! folding rules into. It draws nothing; a view subscribes to [`DocumentEvent`]s and repaints
//! what the [`UpdateRequest`]s tell it to.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Actions (indent, comment, brackets)        │  ← Editing commands
//! ├─────────────────────────────────────────────┤
//! │  Document (events, batches, strategies)     │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Undo / Folding / Markers / Selection       │  ← Offset-tracking state
//! ├─────────────────────────────────────────────┤
//! │  Line Index                                 │  ← Line access
//! ├─────────────────────────────────────────────┤
//! │  Text Buffer (Rope)                         │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Offsets are counted in `char`s. Lines and columns are 0-based.
//!
//! # Quick Start
//!
//! ```rust
//! use textedit_core::{Document, DocumentEvent, TextLocation};
//!
//! let mut doc = Document::from_text("fn main() {\r\n}\n");
//! doc.subscribe(|event| {
//!     if let DocumentEvent::Changed(change) = event {
//!         println!("changed at {}", change.offset);
//!     }
//! });
//!
//! doc.insert(13, "    body();\r\n").unwrap();
//! assert_eq!(doc.line_count(), 4);
//! assert_eq!(doc.line_text(1).unwrap(), "    body();");
//! assert_eq!(doc.offset_to_position(17).unwrap(), TextLocation::new(1, 4));
//!
//! assert!(doc.undo().unwrap());
//! assert_eq!(doc.text(), "fn main() {\r\n}\n");
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - Rope text storage with its line index
//! - [`line_index`] - Line segments and their maintenance under edits
//! - [`document`] - The document façade: edit pipeline, events and update batches
//! - [`undo`] - Grouped undo and redo
//! - [`folding`] - Folds, fold state and visible-line mapping
//! - [`markers`] - Highlight and read-only markers
//! - [`selection`] - Selections that follow edits
//! - [`formatting`] - Indentation and bracket matching strategies
//! - [`actions`] - Line-editing commands
//! - [`io`] - Loading and saving with encoding preserved
//! - [`config`] - Editor properties

pub mod actions;
pub mod buffer;
pub mod config;
pub mod delta;
pub mod document;
mod error;
pub mod events;
pub mod folding;
pub mod formatting;
pub mod io;
pub mod line_ending;
pub mod line_index;
mod location;
pub mod markers;
pub mod selection;
pub mod shared;
mod text;
pub mod undo;

pub use actions::{goto_matching_bracket, indent_selection, outdent_selection, toggle_line_comment};
pub use buffer::TextBuffer;
pub use config::{EditorProperties, IndentStyle};
pub use delta::DocumentChange;
pub use document::{Document, UpdateBatch};
pub use error::{DocumentError, Result};
pub use events::{DocumentCallback, DocumentEvent, SubscriptionId, UpdateRequest};
pub use folding::{DEFAULT_FOLD_TEXT, Fold, FoldingManager, FoldingStrategy};
pub use formatting::{DefaultFormattingStrategy, FormattingStrategy};
pub use io::{TextEncoding, TextFile};
pub use line_ending::LineEnding;
pub use line_index::{LineIndex, LineSegment};
pub use location::TextLocation;
pub use markers::{Color, Marker, MarkerId, MarkerStrategy, MarkerType};
pub use selection::{ColumnRange, Selection, SelectionManager};
pub use shared::SharedDocument;
pub use undo::{UndoStack, UndoTarget, UndoableOperation};

pub use textedit_core_lang::{BracketPair, CommentConfig, LanguageConfig};
