//! Line-editing commands over the current selection.
//!
//! Each command runs as one undo unit inside one update batch, and does nothing (returning
//! `Ok(false)`) when the selection is read-only.

use crate::document::Document;
use crate::error::Result;
use crate::formatting::FormattingStrategy;
use crate::selection::Selection;
use textedit_core_lang::{BracketPair, CommentConfig};
use tracing::debug;

/// Lines covered by `selection`, leaving out a last line it only touches at column 0.
fn covered_lines(document: &Document, selection: &Selection) -> Result<(usize, usize)> {
    let start = selection.start_position(document.buffer())?;
    let end = selection.end_position(document.buffer())?;
    let last = if end.line > start.line && end.column == 0 {
        end.line - 1
    } else {
        end.line
    };
    Ok((start.line, last))
}

fn multi_line_ranges(document: &Document) -> Result<Vec<(usize, usize)>> {
    let mut ranges = Vec::new();
    for selection in document.selection().selections() {
        let start = selection.start_position(document.buffer())?;
        let end = selection.end_position(document.buffer())?;
        if start.line != end.line {
            ranges.push(covered_lines(document, selection)?);
        }
    }
    Ok(ranges)
}

/// Prefix every line of each multi-line selection with one indentation unit.
pub fn indent_selection(document: &mut Document) -> Result<bool> {
    if document.selection_is_read_only() {
        return Ok(false);
    }
    let ranges = multi_line_ranges(document)?;
    if ranges.is_empty() {
        return Ok(false);
    }
    let indentation = document.properties().indentation_string();
    let mut batch = document.batch();
    batch.undo_group(|doc| {
        for &(first, last) in ranges.iter().rev() {
            for line in (first..=last).rev() {
                let offset = doc.line_segment(line)?.offset;
                doc.insert(offset, &indentation)?;
            }
        }
        Ok(())
    })?;
    debug!(target: "format.indent", ranges = ranges.len(), "indent_selection");
    Ok(true)
}

/// Remove one indentation unit from every line of each multi-line selection.
///
/// A leading tab is removed outright. Leading spaces are removed up to the indentation size; a
/// shorter run of spaces followed by a tab is removed together with the tab.
pub fn outdent_selection(document: &mut Document) -> Result<bool> {
    if document.selection_is_read_only() {
        return Ok(false);
    }
    let ranges = multi_line_ranges(document)?;
    let tab_size = document.properties().indentation_size.max(1);
    let mut changed = false;
    let mut batch = document.batch();
    batch.undo_group(|doc| {
        for &(first, last) in ranges.iter().rev() {
            for line in (first..=last).rev() {
                let segment = doc.line_segment(line)?;
                let text = doc.line_text(line)?;
                let remove = outdent_width(&text, tab_size);
                if remove > 0 {
                    doc.remove(segment.offset, remove)?;
                    changed = true;
                }
            }
        }
        Ok(())
    })?;
    Ok(changed)
}

fn outdent_width(line: &str, tab_size: usize) -> usize {
    let mut chars = line.chars();
    match chars.next() {
        Some('\t') => 1,
        Some(' ') => {
            let spaces = 1 + line.chars().skip(1).take_while(|&ch| ch == ' ').count();
            if spaces >= tab_size {
                tab_size
            } else if line.chars().nth(spaces) == Some('\t') {
                spaces + 1
            } else {
                spaces
            }
        }
        _ => 0,
    }
}

/// Comment or uncomment the lines of the selection, or `caret_line` when nothing is selected.
///
/// Blank lines are left alone. If every other covered line already starts with the line comment
/// token (after its indentation) the token is removed from each; otherwise the token is inserted
/// at the start of each non-blank line.
pub fn toggle_line_comment(
    document: &mut Document,
    comments: &CommentConfig,
    caret_line: usize,
) -> Result<bool> {
    let Some(token) = comments.line_token().filter(|token| !token.is_empty()) else {
        return Ok(false);
    };
    if document.selection_is_read_only() {
        return Ok(false);
    }

    let mut lines = Vec::new();
    if document.selection().has_something_selected() {
        for selection in document.selection().selections() {
            let (first, last) = covered_lines(document, selection)?;
            lines.extend(first..=last);
        }
    } else {
        document.line_segment(caret_line)?;
        lines.push(caret_line);
    }
    lines.sort_unstable();
    lines.dedup();

    let mut targets = Vec::new();
    for line in lines {
        let text = document.line_text(line)?;
        if !text.trim().is_empty() {
            targets.push((line, text));
        }
    }
    if targets.is_empty() {
        return Ok(false);
    }
    let uncomment = targets
        .iter()
        .all(|(_, text)| text.trim_start().starts_with(token));
    let token_len = token.chars().count();

    let mut batch = document.batch();
    batch.undo_group(|doc| {
        for (line, text) in targets.iter().rev() {
            let offset = doc.line_segment(*line)?.offset;
            if uncomment {
                if let Some(byte_pos) = text.find(token) {
                    let column = text[..byte_pos].chars().count();
                    doc.remove(offset + column, token_len)?;
                }
            } else {
                doc.insert(offset, token)?;
            }
        }
        Ok(())
    })?;
    debug!(target: "format.indent", lines = targets.len(), uncomment, "toggle_line_comment");
    Ok(true)
}

/// Offset of the bracket matching the one just before `offset`, or else the one at `offset`.
pub fn goto_matching_bracket(
    document: &Document,
    strategy: &dyn FormattingStrategy,
    brackets: &[BracketPair],
    offset: usize,
) -> Option<usize> {
    let candidates = [offset.checked_sub(1), Some(offset)];
    for position in candidates.into_iter().flatten() {
        let Ok(ch) = document.char_at(position) else {
            continue;
        };
        for pair in brackets {
            if ch == pair.open {
                return strategy.search_bracket_forward(document, position + 1, pair.open, pair.close);
            }
            if ch == pair.close {
                return position.checked_sub(1).and_then(|before| {
                    strategy.search_bracket_backward(document, before, pair.open, pair.close)
                });
            }
        }
    }
    None
}
