//! Lexical scanning for brace languages.
//!
//! [`CodeScanner`] is the one state machine behind every "is this character code?" question in
//! the crate: the reformatter, the full bracket search, the folding strategy and the `FormatLine`
//! helpers all feed it characters and look at [`LexState`].

use textedit_core::{Document, Result};

/// Verbatim string prefix of C# (`@"..."`).
pub const CSHARP_VERBATIM_PREFIX: char = '@';

/// Lexical context of the character being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexState {
    /// Plain code.
    #[default]
    Code,
    /// After `//` (or `#` when preprocessor lines are treated as comments).
    LineComment,
    /// Inside `/* ... */`.
    BlockComment,
    /// Inside `"..."`.
    String,
    /// Inside a verbatim string; `""` is an escaped quote and line breaks do not end it.
    VerbatimString,
    /// Inside `'...'`.
    Char,
}

impl LexState {
    /// Returns `true` for the states that survive a line break.
    pub fn spans_lines(self) -> bool {
        matches!(self, Self::BlockComment | Self::VerbatimString)
    }
}

/// Character-at-a-time lexer.
#[derive(Debug, Clone)]
pub struct CodeScanner {
    state: LexState,
    previous: Option<char>,
    skip_next: bool,
    verbatim_prefix: Option<char>,
    hash_comments: bool,
}

impl CodeScanner {
    /// A scanner in code state. `verbatim_prefix` is the character that turns a following `"`
    /// into a verbatim string, if the language has one.
    pub fn new(verbatim_prefix: Option<char>) -> Self {
        Self {
            state: LexState::Code,
            previous: None,
            skip_next: false,
            verbatim_prefix,
            hash_comments: false,
        }
    }

    /// Treat `#` in code as the start of a line comment (preprocessor lines).
    pub fn with_hash_comments(mut self) -> Self {
        self.hash_comments = true;
        self
    }

    /// Current state.
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Returns `true` in plain code.
    pub fn in_code(&self) -> bool {
        self.state == LexState::Code
    }

    /// Continue after a line that ended in `state`. Call [`start_line`](Self::start_line)
    /// before feeding the next line.
    pub fn resume(&mut self, state: LexState) {
        self.state = state;
    }

    /// Forget line-scoped state at a line break.
    pub fn start_line(&mut self) {
        if !self.state.spans_lines() {
            self.state = LexState::Code;
        }
        self.previous = None;
        self.skip_next = false;
    }

    /// Advance over `ch`, with `next` as lookahead.
    ///
    /// Returns `false` when `ch` was swallowed by an escape (`\x` in a string or character
    /// literal, `""` in a verbatim string); such a character changes no state.
    pub fn advance(&mut self, ch: char, next: Option<char>) -> bool {
        if ch == '\n' || ch == '\r' {
            self.start_line();
            return true;
        }
        let previous = self.previous.replace(ch);
        if self.skip_next {
            self.skip_next = false;
            return false;
        }
        match (self.state, ch) {
            (LexState::BlockComment, '/') if previous == Some('*') => {
                self.state = LexState::Code;
                self.open_comment(next);
            }
            (LexState::Code, '/') => self.open_comment(next),
            (LexState::Code, '#') if self.hash_comments => self.state = LexState::LineComment,
            (LexState::Code, '"') => {
                self.state = if previous.is_some() && previous == self.verbatim_prefix {
                    LexState::VerbatimString
                } else {
                    LexState::String
                };
            }
            (LexState::String, '"') => self.state = LexState::Code,
            (LexState::VerbatimString, '"') => {
                if next == Some('"') {
                    self.skip_next = true;
                } else {
                    self.state = LexState::Code;
                }
            }
            (LexState::Code, '\'') => self.state = LexState::Char,
            (LexState::Char, '\'') => self.state = LexState::Code,
            (LexState::String | LexState::Char, '\\') => self.skip_next = true,
            _ => {}
        }
        true
    }

    fn open_comment(&mut self, next: Option<char>) {
        match next {
            Some('/') => self.state = LexState::LineComment,
            Some('*') => self.state = LexState::BlockComment,
            _ => {}
        }
    }
}

/// What a position inside a line is, judged from the start of that line only.
///
/// Block comments opened on earlier lines are not seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    /// Plain code.
    Code,
    /// After `//` on the same line.
    LineComment,
    /// Inside a string or character literal.
    Literal,
}

/// Classify the end of `prefix`, the text of a line up to some position.
pub fn get_start_type(prefix: impl IntoIterator<Item = char>, verbatim_prefix: Option<char>) -> StartType {
    let mut scanner = CodeScanner::new(verbatim_prefix);
    let mut chars = prefix.into_iter().peekable();
    while let Some(ch) = chars.next() {
        scanner.advance(ch, chars.peek().copied());
    }
    match scanner.state() {
        LexState::LineComment => StartType::LineComment,
        LexState::String | LexState::VerbatimString | LexState::Char => StartType::Literal,
        LexState::Code | LexState::BlockComment => StartType::Code,
    }
}

/// Returns `true` if `text` opens more `{` than it closes, ignoring comments and literals.
pub fn need_curly_bracket(text: &str, verbatim_prefix: Option<char>) -> bool {
    let mut scanner = CodeScanner::new(verbatim_prefix);
    let mut depth: isize = 0;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if !scanner.advance(ch, chars.peek().copied()) || !scanner.in_code() {
            continue;
        }
        match ch {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }
    depth > 0
}

/// Returns `true` if a line break split a normal string literal: `start` ends inside the string
/// and `end` closes it.
pub fn is_in_non_verbatim_string(start: &str, end: &str, verbatim_prefix: Option<char>) -> bool {
    let mut in_string = false;
    let mut in_char = false;
    if !scan_literal(start, &mut in_string, &mut in_char, verbatim_prefix) || !in_string {
        return false;
    }
    scan_literal(end, &mut in_string, &mut in_char, verbatim_prefix);
    !in_string
}

/// Track string and character literals over one line. Returns `false` on a verbatim string or
/// a comment, where scanning stops.
fn scan_literal(
    text: &str,
    in_string: &mut bool,
    in_char: &mut bool,
    verbatim_prefix: Option<char>,
) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let previous = i.checked_sub(1).map(|p| chars[p]);
        if ch == '"' && !*in_char {
            if !*in_string && previous.is_some() && previous == verbatim_prefix {
                return false;
            }
            *in_string = !*in_string;
        } else if ch == '\'' && !*in_string {
            *in_char = !*in_char;
        }
        if !*in_string && previous == Some('/') && (ch == '/' || ch == '*') {
            return false;
        }
        if *in_string && ch == '\\' {
            i += 1;
        }
        i += 1;
    }
    true
}

/// Returns `true` if the end of `prefix` (a line up to the caret) is inside a literal or a
/// `//` comment.
pub fn is_inside_string_or_comment(prefix: &str, verbatim_prefix: Option<char>) -> bool {
    let chars: Vec<char> = prefix.chars().collect();
    let mut quote: Option<char> = None;
    let mut verbatim = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let previous = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        match quote {
            Some(open) if ch == open => {
                if verbatim && next == Some('"') {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some(_) if ch == '\\' && !verbatim => i += 1,
            Some(_) => {}
            None if ch == '/' && next == Some('/') => return true,
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                verbatim = ch == '"' && previous.is_some() && previous == verbatim_prefix;
            }
            None => {}
        }
        i += 1;
    }
    quote.is_some()
}

/// Returns `true` if `prefix` (a line up to the caret) contains `///` before any string.
pub fn is_inside_documentation_comment(prefix: &str) -> bool {
    for (i, ch) in prefix.char_indices() {
        if ch == '"' {
            return false;
        }
        if prefix[i..].starts_with("///") {
            return true;
        }
    }
    false
}

/// Returns `true` if the document has more `#region` lines than `#endregion` lines.
pub fn need_endregion(document: &Document) -> Result<bool> {
    let mut regions = 0usize;
    let mut endregions = 0usize;
    for line in 0..document.line_count() {
        let text = document.line_text(line)?;
        let text = text.trim();
        if text.starts_with("#region") {
            regions += 1;
        } else if text.starts_with("#endregion") {
            endregions += 1;
        }
    }
    Ok(regions > endregions)
}

/// Lexical state at the end of `line` (before its delimiter), scanning from the top.
pub fn line_end_state(document: &Document, line: usize, verbatim_prefix: Option<char>) -> Result<LexState> {
    let end = document.line_segment(line)?.end_offset();
    let mut scanner = CodeScanner::new(verbatim_prefix);
    let mut chars = document.chars_from(0)?.take(end).peekable();
    while let Some(ch) = chars.next() {
        scanner.advance(ch, chars.peek().copied());
    }
    Ok(scanner.state())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: Option<char> = Some(CSHARP_VERBATIM_PREFIX);

    fn states(text: &str) -> Vec<LexState> {
        let mut scanner = CodeScanner::new(AT);
        let mut chars = text.chars().peekable();
        let mut out = Vec::new();
        while let Some(ch) = chars.next() {
            scanner.advance(ch, chars.peek().copied());
            out.push(scanner.state());
        }
        out
    }

    #[test]
    fn test_comment_transitions() {
        use LexState::*;
        assert_eq!(states("a/*b*/c"), vec![Code, BlockComment, BlockComment, BlockComment, BlockComment, Code, Code]);
        assert_eq!(*states("x // y").last().unwrap(), LineComment);
        assert_eq!(*states("x // y\nz").last().unwrap(), Code);
        assert_eq!(*states("/* a\nb").last().unwrap(), BlockComment);
    }

    #[test]
    fn test_literals() {
        use LexState::*;
        assert_eq!(*states(r#""a\"b"#).last().unwrap(), String);
        assert_eq!(*states(r#"@"a\"#).last().unwrap(), VerbatimString);
        assert_eq!(*states(r#"@"a""b"#).last().unwrap(), VerbatimString);
        assert_eq!(*states(r#"@"a""b""#).last().unwrap(), Code);
        assert_eq!(*states("'\\''").last().unwrap(), Code);
        assert_eq!(*states("\"open\nx").last().unwrap(), Code);
        assert_eq!(*states("@\"open\nx").last().unwrap(), VerbatimString);
    }

    #[test]
    fn test_hash_comments() {
        let mut scanner = CodeScanner::new(AT).with_hash_comments();
        scanner.advance('#', Some('r'));
        assert_eq!(scanner.state(), LexState::LineComment);
        scanner.start_line();
        assert!(scanner.in_code());
    }

    #[test]
    fn test_need_curly_bracket() {
        assert!(need_curly_bracket("class A {\n", AT));
        assert!(!need_curly_bracket("class A { }", AT));
        assert!(!need_curly_bracket("x = \"{\"; // {", AT));
        assert!(need_curly_bracket("s = @\"}\"; {", AT));
    }

    #[test]
    fn test_split_string_detection() {
        assert!(is_in_non_verbatim_string("x = \"abc", "def\";", AT));
        assert!(!is_in_non_verbatim_string("x = @\"abc", "def\";", AT));
        assert!(!is_in_non_verbatim_string("x = \"abc\";", "y;", AT));
        assert!(!is_in_non_verbatim_string("x = \"abc", "def", AT));
    }

    #[test]
    fn test_caret_context() {
        assert!(is_inside_string_or_comment("x = \"a{", AT));
        assert!(is_inside_string_or_comment("x; // a(", AT));
        assert!(!is_inside_string_or_comment("x = \"a\" + (", AT));
        assert!(is_inside_string_or_comment("c = '\\'", AT));
        assert!(is_inside_documentation_comment("  /// <summary"));
        assert!(!is_inside_documentation_comment("s = \"///\""));
    }

    #[test]
    fn test_start_type() {
        assert_eq!(get_start_type("f(a, ".chars(), AT), StartType::Code);
        assert_eq!(get_start_type("f(\"a, ".chars(), AT), StartType::Literal);
        assert_eq!(get_start_type("x // (".chars(), AT), StartType::LineComment);
    }
}
