//! Small string helpers over character columns.

use unicode_segmentation::UnicodeSegmentation;

/// Leading whitespace of `line`.
pub(crate) fn leading_whitespace(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map_or(line.len(), |(idx, _)| idx);
    &line[..end]
}

/// Number of characters in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of character column `column` in `line` (clamped to the end).
pub(crate) fn byte_index(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map_or(line.len(), |(idx, _)| idx)
}

/// Largest grapheme-cluster boundary (as a character column) that is `<= column`.
pub(crate) fn snap_to_grapheme_boundary(line: &str, column: usize) -> usize {
    let mut snapped = 0;
    let mut chars_seen = 0;
    for grapheme in line.graphemes(true) {
        if chars_seen > column {
            break;
        }
        snapped = chars_seen;
        chars_seen += grapheme.chars().count();
    }
    if chars_seen <= column {
        snapped = chars_seen;
    }
    snapped.min(column)
}
