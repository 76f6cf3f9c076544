//! Full bracket scans that skip comments and literals.
//!
//! These are the slow paths behind the quick scans of `textedit_core::formatting`: the quick
//! scans give up at the first quote or comment, these run the [`CodeScanner`] over the text.

use crate::scanner::CodeScanner;

/// Position of the `open` bracket left unmatched at `end` (inclusive), scanning `chars` from
/// the start of the document.
pub fn scan_backward(
    chars: impl IntoIterator<Item = char>,
    end: usize,
    open: char,
    close: char,
    verbatim_prefix: Option<char>,
) -> Option<usize> {
    let mut scanner = CodeScanner::new(verbatim_prefix);
    let mut stack = Vec::new();
    let mut chars = chars.into_iter().take(end + 1).enumerate().peekable();
    while let Some((i, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, ch)| ch);
        if !scanner.advance(ch, next) || !scanner.in_code() {
            continue;
        }
        if ch == open {
            stack.push(i);
        } else if ch == close {
            stack.pop();
        }
    }
    stack.pop()
}

/// Position of the `close` bracket matching an `open` bracket just before `start`, scanning
/// `chars` (the text from `start` on). Scanning starts in code.
pub fn scan_forward(
    chars: impl IntoIterator<Item = char>,
    start: usize,
    open: char,
    close: char,
    verbatim_prefix: Option<char>,
) -> Option<usize> {
    let mut scanner = CodeScanner::new(verbatim_prefix);
    let mut depth = 1usize;
    let mut chars = chars.into_iter().enumerate().peekable();
    while let Some((i, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, ch)| ch);
        if !scanner.advance(ch, next) || !scanner.in_code() {
            continue;
        }
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(start + i);
            }
        }
    }
    None
}
