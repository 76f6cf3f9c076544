#![warn(missing_docs)]
//! `textedit-core-cfamily` - brace-language strategies for `textedit-core`.
//!
//! This crate plugs C#, HLSL and similar languages into a [`textedit_core::Document`]:
//!
//! - [`CFamilyFormattingStrategy`] indents as you type (one-line `if` bodies, `switch` labels,
//!   continuation lines), continues `/* */` and `///` comments, splits strings broken by Enter,
//!   inserts the closing `}` and `#endregion`, and matches brackets outside comments and literals;
//! - [`CFamilyFoldingStrategy`] folds type bodies, method bodies and `#region`s;
//! - [`IndentationReformatter`] re-indents whole ranges, over a document through
//!   [`DocumentAccessor`] or over a string through [`StringAccessor`];
//! - [`LineStateCache`] remembers how each line ends lexically, so Enter does not re-lex the
//!   document.
//!
//! ```rust
//! use textedit_core::Document;
//! use textedit_core_cfamily::CFamilyFormattingStrategy;
//!
//! let mut doc = Document::from_text("void F()\n{\n\tif (x)\n");
//! CFamilyFormattingStrategy::csharp().attach(&mut doc);
//!
//! // Enter was pressed at the end of `if (x)`.
//! let caret = doc.format_line(3, doc.text_length(), '\n').unwrap();
//! assert_eq!(caret, Some(2));
//! assert_eq!(doc.line_text(3).unwrap(), "\t\t");
//! ```

pub mod accessor;
pub mod brackets;
pub mod folding;
pub mod formatting;
pub mod line_states;
pub mod reformatter;
pub mod scanner;

pub use accessor::{DocumentAccessor, LineAccessor, StringAccessor};
pub use folding::CFamilyFoldingStrategy;
pub use formatting::CFamilyFormattingStrategy;
pub use line_states::LineStateCache;
pub use reformatter::{Block, IndentationReformatter, IndentationSettings};
pub use scanner::{CodeScanner, LexState};

use textedit_core::Result;

/// Re-indent all of `text` with `settings`, for a language whose verbatim strings start with
/// `verbatim_prefix`.
pub fn reformat_text(text: &str, settings: &IndentationSettings, verbatim_prefix: Option<char>) -> Result<String> {
    let mut accessor = StringAccessor::new(text);
    IndentationReformatter::new(verbatim_prefix).reformat(&mut accessor, settings)?;
    Ok(accessor.into_output())
}
