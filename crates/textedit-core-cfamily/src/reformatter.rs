//! The brace-language indentation reformatter.
//!
//! One pass walks the lines of a [`LineAccessor`] top to bottom. A [`CodeScanner`] tracks
//! comments and literals across lines, and a stack of [`Block`]s tracks the open `{`, `(` and
//! `[` nesting. Each writable line gets the indentation of the block it starts in.
//!
//! Read-only lines are still scanned, and their existing indentation is adopted for the block
//! when nothing else (a continuation, a one-line block) explains it. That is how reformatting a
//! single line keeps the style of the code around it.

use crate::accessor::LineAccessor;
use crate::scanner::{CodeScanner, LexState};
use textedit_core::{EditorProperties, Result};
use tracing::trace;

/// Keywords whose statement may be a single line without braces.
const SINGLE_STATEMENT_KEYWORDS: [&str; 7] = ["if", "for", "while", "do", "foreach", "using", "lock"];

fn is_single_statement_keyword(word: &str) -> bool {
    SINGLE_STATEMENT_KEYWORDS.contains(&word)
}

/// Reformatter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentationSettings {
    /// One indentation unit.
    pub indent_string: String,
    /// Keep empty lines empty instead of indenting them.
    pub leave_empty_lines: bool,
}

impl Default for IndentationSettings {
    fn default() -> Self {
        Self {
            indent_string: "\t".to_string(),
            leave_empty_lines: true,
        }
    }
}

impl IndentationSettings {
    /// Settings matching the document properties.
    pub fn from_properties(properties: &EditorProperties) -> Self {
        Self {
            indent_string: properties.indentation_string(),
            leave_empty_lines: properties.leave_empty_lines,
        }
    }
}

/// One level of bracket nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Indentation of the line holding the brackets.
    pub outer_indent: String,
    /// Indentation of the lines inside.
    pub inner_indent: String,
    /// Last identifier seen in the block.
    pub last_word: String,
    /// The opening bracket: `{`, `(` or `[`.
    pub bracket: char,
    /// The current statement continues on the next line.
    pub continuation: bool,
    /// The next line is the body of a braceless `if`, `else`, `while`, ...
    pub one_line_block: bool,
    /// Line the block was opened on.
    pub start_line: usize,
}

impl Default for Block {
    fn default() -> Self {
        Self {
            outer_indent: String::new(),
            inner_indent: String::new(),
            last_word: String::new(),
            bracket: '{',
            continuation: false,
            one_line_block: false,
            start_line: 0,
        }
    }
}

impl Block {
    /// Open a nested level, `unit` deeper than this one.
    pub fn indent(&mut self, unit: &str) {
        self.outer_indent = self.inner_indent.clone();
        self.inner_indent.push_str(unit);
        self.continuation = false;
        self.one_line_block = false;
        self.last_word.clear();
    }
}

/// Single-pass indentation state machine.
#[derive(Debug, Clone)]
pub struct IndentationReformatter {
    verbatim_prefix: Option<char>,
    scanner: CodeScanner,
    word: String,
    blocks: Vec<Block>,
    block: Block,
    last_real_char: char,
}

impl IndentationReformatter {
    /// A reformatter for a language whose verbatim strings start with `verbatim_prefix`.
    pub fn new(verbatim_prefix: Option<char>) -> Self {
        Self {
            verbatim_prefix,
            scanner: CodeScanner::new(verbatim_prefix).with_hash_comments(),
            word: String::new(),
            blocks: Vec::new(),
            block: Block::default(),
            last_real_char: ' ',
        }
    }

    /// Reformat every line the accessor yields.
    pub fn reformat(&mut self, accessor: &mut impl LineAccessor, settings: &IndentationSettings) -> Result<()> {
        *self = Self::new(self.verbatim_prefix);
        let mut lines = 0usize;
        while accessor.next()? {
            self.step(accessor, settings);
            lines += 1;
        }
        trace!(target: "format.indent", lines, depth = self.blocks.len(), "reformat");
        Ok(())
    }

    /// Returns `true` if the last line scanned ended inside a block comment or verbatim string.
    pub fn in_multi_line_literal_or_comment(&self) -> bool {
        self.scanner.state().spans_lines()
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            self.block.last_word = std::mem::take(&mut self.word);
        }
    }

    fn is_label_line(&self, line: &str) -> bool {
        let last_word = &self.block.last_word;
        last_word == "case"
            || line.starts_with("case ")
            || line.strip_prefix(last_word.as_str()).is_some_and(|rest| rest.starts_with(':'))
    }

    fn step(&mut self, doc: &mut impl LineAccessor, settings: &IndentationSettings) {
        let unit = settings.indent_string.as_str();
        let text = doc.text().to_string();
        if settings.leave_empty_lines && text.is_empty() {
            return;
        }
        let mut line = text.trim_start().to_string();
        if line.is_empty() {
            if self.in_multi_line_literal_or_comment() {
                return;
            }
            let mut indent = self.block.inner_indent.clone();
            if self.block.one_line_block {
                indent.push_str(unit);
            }
            if self.block.continuation {
                indent.push_str(unit);
            }
            if text != indent {
                doc.set_text(indent);
            }
            return;
        }

        if trim_end(doc) {
            line = doc.text().trim_start().to_string();
        }

        let mut old_block = self.block.clone();
        let start_in_comment = self.scanner.state() == LexState::BlockComment;
        let start_in_string = self.scanner.state() == LexState::VerbatimString;

        self.scanner.start_line();
        self.last_real_char = '\n';
        let chars: Vec<char> = line.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if self.scanner.state() == LexState::LineComment {
                break;
            }
            if !self.scanner.advance(c, chars.get(i + 1).copied()) {
                continue;
            }
            if !self.scanner.in_code() {
                self.flush_word();
                continue;
            }

            if !c.is_whitespace() && c != '[' && c != '/' && self.block.bracket == '{' {
                self.block.continuation = true;
            }
            if c.is_alphanumeric() {
                self.word.push(c);
            } else {
                self.flush_word();
            }

            match c {
                '{' => {
                    self.block.one_line_block = false;
                    self.blocks.push(self.block.clone());
                    self.block.start_line = doc.line_number();
                    if self.block.last_word == "switch" {
                        self.block.indent(&unit.repeat(2));
                    } else {
                        self.block.indent(unit);
                    }
                    self.block.bracket = '{';
                }
                '}' => {
                    while self.block.bracket != '{' {
                        match self.blocks.pop() {
                            Some(outer) => self.block = outer,
                            None => break,
                        }
                    }
                    if let Some(outer) = self.blocks.pop() {
                        self.block = outer;
                        self.block.continuation = false;
                        self.block.one_line_block = false;
                    }
                }
                '(' | '[' => {
                    self.blocks.push(self.block.clone());
                    if self.block.start_line == doc.line_number() {
                        self.block.inner_indent = self.block.outer_indent.clone();
                    } else {
                        self.block.start_line = doc.line_number();
                    }
                    let mut extra = String::new();
                    if old_block.one_line_block {
                        extra.push_str(unit);
                    }
                    if old_block.continuation {
                        extra.push_str(unit);
                    }
                    if i == chars.len() - 1 {
                        extra.push_str(unit);
                    } else {
                        extra.push_str(&" ".repeat(i + 1));
                    }
                    self.block.indent(&extra);
                    self.block.bracket = c;
                }
                ')' | ']' => {
                    let open = if c == ')' { '(' } else { '[' };
                    if self.block.bracket == open
                        && let Some(outer) = self.blocks.pop()
                    {
                        self.block = outer;
                        if c == ')' && is_single_statement_keyword(&self.block.last_word) {
                            self.block.continuation = false;
                        }
                    }
                }
                ';' | ',' => {
                    self.block.continuation = false;
                    self.block.one_line_block = false;
                }
                ':' if self.is_label_line(&line) => {
                    self.block.continuation = false;
                    self.block.one_line_block = false;
                }
                _ => {}
            }

            if !c.is_whitespace() {
                self.last_real_char = c;
            }
        }
        self.flush_word();

        let first = chars[0];
        if start_in_string || (start_in_comment && first != '*') {
            return;
        }
        if doc.text().starts_with("//\t") || doc.text() == "//" {
            return;
        }

        let mut indent = if first == '}' {
            old_block.one_line_block = false;
            old_block.continuation = false;
            old_block.outer_indent.clone()
        } else {
            old_block.inner_indent.clone()
        };
        if (old_block.bracket == '(' && first == ')') || (old_block.bracket == '[' && first == ']') {
            indent.pop();
        }

        if first == ':' {
            old_block.continuation = true;
        } else if self.last_real_char == ':' && indent.chars().count() >= unit.chars().count() {
            if self.is_label_line(&line) {
                let keep = indent.chars().count() - unit.chars().count();
                indent = indent.chars().take(keep).collect();
            }
        } else if self.last_real_char == ')' {
            if is_single_statement_keyword(&self.block.last_word) {
                self.block.one_line_block = true;
            }
        } else if self.last_real_char == 'e' && self.block.last_word == "else" {
            self.block.one_line_block = true;
            self.block.continuation = false;
        }

        if doc.is_read_only() {
            if !old_block.continuation
                && !old_block.one_line_block
                && old_block.start_line == self.block.start_line
                && self.block.start_line < doc.line_number()
                && self.last_real_char != ':'
            {
                let mut existing: String = doc.text().chars().take_while(|ch| ch.is_whitespace()).collect();
                // The extra space of a ` * ` comment line is not block indentation.
                if start_in_comment && existing.ends_with(' ') {
                    existing.pop();
                }
                self.block.inner_indent = existing;
            }
            return;
        }

        if first != '{' {
            if first != ')' && old_block.continuation && old_block.bracket == '{' {
                indent.push_str(unit);
            }
            if old_block.one_line_block {
                indent.push_str(unit);
            }
        }
        if start_in_comment {
            indent.push(' ');
        }

        let current = doc.text();
        let leading = current.len() - line.len();
        let misplaced = indent.len() != leading
            || !current.starts_with(&indent)
            || current[indent.len()..].chars().next().is_some_and(char::is_whitespace);
        if misplaced {
            indent.push_str(&line);
            doc.set_text(indent);
        }
    }
}

/// Strip trailing whitespace from the current line, except the single space of an empty
/// `// ` or ` * ` comment. Returns `true` if the line was trimmed.
fn trim_end(doc: &mut impl LineAccessor) -> bool {
    let text = doc.text();
    if !text.ends_with(char::is_whitespace) || text.ends_with("// ") || text.ends_with("* ") {
        return false;
    }
    let trimmed = text.trim_end().to_string();
    doc.set_text(trimmed);
    true
}
