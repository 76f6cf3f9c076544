//! Formatting strategies.
//!
//! A [`FormattingStrategy`] decides how lines are indented and how brackets are matched. The
//! provided methods implement the language-neutral behaviour (copy the previous line's
//! indentation, quick bracket scans), so [`DefaultFormattingStrategy`] is an empty impl and a
//! language strategy only overrides what it refines.
//!
//! Strategies are stored in the document as `Arc<dyn FormattingStrategy>`; the document clones
//! the `Arc` before calling in, which lets the strategy take `&mut Document`.

use crate::config::IndentStyle;
use crate::document::Document;
use crate::error::Result;
use crate::text::{char_len, leading_whitespace};
use tracing::trace;

/// Indentation and bracket matching for one language.
pub trait FormattingStrategy: Send + Sync {
    /// Indent `line` according to the document's [`IndentStyle`], inside one undo group.
    ///
    /// Returns the length of the new indentation, which is where the caret belongs.
    fn indent_line(&self, document: &mut Document, line: usize) -> Result<usize> {
        let style = document.properties().indent_style;
        trace!(target: "format.indent", line, ?style, "indent_line");
        document.undo_group(|doc| match style {
            IndentStyle::None => Ok(0),
            IndentStyle::Auto => self.auto_indent_line(doc, line),
            IndentStyle::Smart => self.smart_indent_line(doc, line),
        })
    }

    /// Give `line` the indentation of the line above.
    fn auto_indent_line(&self, document: &mut Document, line: usize) -> Result<usize> {
        auto_indent_line(document, line)
    }

    /// Language-aware indentation. Plain text has none, so this falls back to auto indent.
    fn smart_indent_line(&self, document: &mut Document, line: usize) -> Result<usize> {
        self.auto_indent_line(document, line)
    }

    /// Indent lines `begin..=end` as one undoable unit.
    fn indent_lines(&self, document: &mut Document, begin: usize, end: usize) -> Result<()> {
        indent_each_line(self, document, begin, end)
    }

    /// React to `ch` having been typed on `line` with the caret at `caret_offset`.
    ///
    /// Returns the caret column when the strategy moved the caret.
    fn format_line(
        &self,
        document: &mut Document,
        line: usize,
        caret_offset: usize,
        ch: char,
    ) -> Result<Option<usize>> {
        let _ = caret_offset;
        if ch == '\n' {
            return self.indent_line(document, line).map(Some);
        }
        Ok(None)
    }

    /// Offset of the `open` bracket matching a `close` bracket just after `offset`.
    fn search_bracket_backward(
        &self,
        document: &Document,
        offset: usize,
        open: char,
        close: char,
    ) -> Option<usize> {
        quick_search_bracket_backward(document, offset, open, close)
    }

    /// Offset of the `close` bracket matching an `open` bracket just before `offset`.
    fn search_bracket_forward(
        &self,
        document: &Document,
        offset: usize,
        open: char,
        close: char,
    ) -> Option<usize> {
        quick_search_bracket_forward(document, offset, open, close)
    }
}

/// Copy-previous-indent formatting for text without language support.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormattingStrategy;

impl FormattingStrategy for DefaultFormattingStrategy {}

/// Run `strategy.indent_line` over `begin..=end` in one undo group.
pub fn indent_each_line<S: FormattingStrategy + ?Sized>(
    strategy: &S,
    document: &mut Document,
    begin: usize,
    end: usize,
) -> Result<()> {
    document.undo_group(|doc| {
        for line in begin..=end {
            strategy.indent_line(doc, line)?;
        }
        Ok(())
    })
}

/// Leading whitespace of `line`.
pub fn get_indentation(document: &Document, line: usize) -> Result<String> {
    let text = document.line_text(line)?;
    Ok(leading_whitespace(&text).to_string())
}

/// Prefix `line` with the indentation of the line above. Returns the indentation length.
pub fn auto_indent_line(document: &mut Document, line: usize) -> Result<usize> {
    let indentation = if line > 0 {
        get_indentation(document, line - 1)?
    } else {
        String::new()
    };
    if !indentation.is_empty() {
        let new_text = format!("{indentation}{}", document.line_text(line)?.trim());
        smart_replace_line(document, line, &new_text)?;
    }
    Ok(char_len(&indentation))
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Replace the text of `line` with `new_text`.
///
/// When the trimmed `new_text` already occurs in the line only the whitespace around it is
/// rewritten, so markers and folds on the content survive.
pub fn smart_replace_line(document: &mut Document, line: usize, new_text: &str) -> Result<()> {
    let segment = document.line_segment(line)?;
    let old_text = document.line_text(line)?;
    if old_text == new_text {
        return Ok(());
    }
    let trimmed = new_text.trim_matches(is_blank);
    match old_text.find(trimmed) {
        Some(byte_pos) if !trimmed.is_empty() => {
            let pos = char_len(&old_text[..byte_pos]);
            let trimmed_len = char_len(trimmed);
            let leading: String = new_text.chars().take_while(|&ch| is_blank(ch)).collect();
            let leading_len = char_len(&leading);
            let trailing_len = char_len(new_text) - trimmed_len - leading_len;
            let trailing: String = new_text.chars().skip(leading_len + trimmed_len).collect();
            debug_assert_eq!(char_len(&trailing), trailing_len);
            document.undo_group(|doc| {
                doc.replace(
                    segment.offset + pos + trimmed_len,
                    segment.length - pos - trimmed_len,
                    &trailing,
                )?;
                doc.replace(segment.offset, pos, &leading)
            })
        }
        _ => document.replace(segment.offset, segment.length, new_text),
    }
}

/// Scan backwards from `offset` for the `open` bracket, giving up at quotes and comments.
pub fn quick_search_bracket_backward(
    document: &Document,
    offset: usize,
    open: char,
    close: char,
) -> Option<usize> {
    if offset >= document.text_length() {
        return None;
    }
    let mut depth: isize = -1;
    for i in (0..=offset).rev() {
        let ch = document.char_at(i).ok()?;
        if ch == open {
            depth += 1;
            if depth == 0 {
                return Some(i);
            }
        } else if ch == close {
            depth -= 1;
        } else if ch == '"' || ch == '\'' {
            break;
        } else if ch == '/' && i > 0 && matches!(document.char_at(i - 1), Ok('/' | '*')) {
            break;
        }
    }
    trace!(target: "format.brackets", offset, %open, "quick_backward_gave_up");
    None
}

/// Scan forwards from `offset` for the `close` bracket, giving up at quotes and comments.
pub fn quick_search_bracket_forward(
    document: &Document,
    offset: usize,
    open: char,
    close: char,
) -> Option<usize> {
    let mut depth: isize = 1;
    let mut previous = offset
        .checked_sub(1)
        .and_then(|i| document.char_at(i).ok());
    for (i, ch) in document.chars_from(offset).ok()?.enumerate() {
        let i = offset + i;
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        } else if ch == '"' || ch == '\'' {
            break;
        } else if (ch == '/' || ch == '*') && previous == Some('/') {
            break;
        }
        previous = Some(ch);
    }
    trace!(target: "format.brackets", offset, %close, "quick_forward_gave_up");
    None
}
