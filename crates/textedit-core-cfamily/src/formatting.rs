//! [`FormattingStrategy`] for brace languages.

use crate::accessor::{DocumentAccessor, LineAccessor};
use crate::brackets::{scan_backward, scan_forward};
use crate::line_states::LineStateCache;
use crate::reformatter::{IndentationReformatter, IndentationSettings};
use crate::scanner::{
    LexState, StartType, get_start_type, is_in_non_verbatim_string, is_inside_documentation_comment,
    is_inside_string_or_comment, line_end_state, need_curly_bracket, need_endregion,
};
use textedit_core::formatting::{
    auto_indent_line, get_indentation, indent_each_line, quick_search_bracket_backward,
    quick_search_bracket_forward,
};
use std::sync::{Arc, Mutex, PoisonError};
use textedit_core::{Document, FormattingStrategy, IndentStyle, Result, SubscriptionId};
use textedit_core_lang::LanguageConfig;
use tracing::{debug, trace};

/// Smart indentation, typing reactions and comment-aware bracket matching for C#, HLSL and
/// similar languages.
///
/// A strategy installed with [`attach`](Self::attach) caches end-of-line lexer states for its
/// document; one installed with [`Document::set_formatting_strategy`] lexes from the top of the
/// document whenever it needs them.
#[derive(Debug, Clone)]
pub struct CFamilyFormattingStrategy {
    verbatim_prefix: Option<char>,
    doc_comments: bool,
    line_states: Option<Arc<Mutex<LineStateCache>>>,
}

impl CFamilyFormattingStrategy {
    /// Strategy for the lexical rules of `language`.
    pub fn new(language: &LanguageConfig) -> Self {
        Self {
            verbatim_prefix: language.verbatim_string_prefix,
            doc_comments: language.comments.doc_line.is_some(),
            line_states: None,
        }
    }

    /// C# with `///` documentation comments and `@"..."` strings.
    pub fn csharp() -> Self {
        Self::new(&LanguageConfig::csharp())
    }

    /// HLSL.
    pub fn hlsl() -> Self {
        Self::new(&LanguageConfig::hlsl())
    }

    /// Install a copy of this strategy on `document`, with a line state cache that follows the
    /// document's edits. The returned subscription keeps the cache current.
    pub fn attach(&self, document: &mut Document) -> SubscriptionId {
        let cache = Arc::new(Mutex::new(LineStateCache::new(self.verbatim_prefix)));
        let subscription = LineStateCache::track(&cache, document);
        document.set_formatting_strategy(Arc::new(Self {
            line_states: Some(cache),
            ..self.clone()
        }));
        subscription
    }

    fn line_end_state(&self, document: &Document, line: usize) -> Result<LexState> {
        match &self.line_states {
            Some(cache) => cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .line_end_state(document, line),
            None => line_end_state(document, line, self.verbatim_prefix),
        }
    }

    fn reformatter(&self) -> IndentationReformatter {
        IndentationReformatter::new(self.verbatim_prefix)
    }

    fn start_type_at(&self, document: &Document, offset: usize) -> Result<StartType> {
        let segment = document.line_segment_for_offset(offset)?;
        let prefix = document.chars_from(segment.offset)?.take(offset - segment.offset);
        Ok(get_start_type(prefix, self.verbatim_prefix))
    }

    fn format_line_in_group(
        &self,
        document: &mut Document,
        line: usize,
        caret_offset: usize,
        ch: char,
    ) -> Result<Option<usize>> {
        if ch == '/' {
            return Ok(None);
        }
        let segment = document.line_segment(line)?;
        let column = caret_offset.saturating_sub(segment.offset).min(segment.length);
        let text = document.line_text(line)?;
        let prefix: String = text.chars().take(column).collect();
        if ch != '\n' && ch != '>' && is_inside_string_or_comment(&prefix, self.verbatim_prefix) {
            return Ok(None);
        }

        match ch {
            '>' => {
                if self.doc_comments && is_inside_documentation_comment(&prefix) {
                    close_xml_tag(document, &text, column, caret_offset)?;
                }
                Ok(None)
            }
            ':' | ')' | ']' | '}' | '{' => {
                if document.properties().indent_style != IndentStyle::Smart {
                    return Ok(None);
                }
                let old_indent = leading_whitespace(&text);
                let new_indent = self.indent_line(document, line)?;
                Ok(Some((column + new_indent).saturating_sub(old_indent)))
            }
            '\n' => self.format_new_line(document, line).map(Some),
            _ => Ok(None),
        }
    }

    /// Reaction to Enter: `line` is the new line. Returns the caret column.
    fn format_new_line(&self, document: &mut Document, line: usize) -> Result<usize> {
        let above_text = match line {
            0 => String::new(),
            _ => document.line_text(line - 1)?,
        };
        let current_text = document.line_text(line)?;

        if above_text.trim().starts_with("#region") && need_endregion(document)? {
            let offset = document.line_segment(line)?.offset;
            document.insert(offset, "#endregion")?;
            debug!(target: "format.indent", line, "endregion_inserted");
            return self.indent_line(document, line);
        }

        let mut caret_shift = 0;
        if line > 0 {
            match self.line_end_state(document, line - 1)? {
                LexState::BlockComment => {
                    let continuation = match char_index(&above_text, "/*") {
                        Some(index) if index > 0 => Some((index, " * ")),
                        _ => char_index(&above_text, "*")
                            .filter(|&index| index > 0)
                            .map(|index| (index, "* ")),
                    };
                    if let Some((index, star)) = continuation {
                        let indentation = padded_indentation(document, line - 1, index)?;
                        let caret = indentation.chars().count() + star.len() + current_text.chars().count();
                        replace_line(document, line, &format!("{indentation}{star}{current_text}"))?;
                        return Ok(caret);
                    }
                }
                LexState::LineComment | LexState::String | LexState::Char => {
                    let next_text = if line + 1 < document.line_count() {
                        document.line_text(line + 1)?
                    } else {
                        String::new()
                    };
                    if let Some(index) = char_index(&above_text, "///")
                        && index > 0
                        && (next_text.contains("///") || index + 4 < above_text.chars().count())
                    {
                        let indentation = padded_indentation(document, line - 1, index)?;
                        replace_line(document, line, &format!("{indentation}/// {current_text}"))?;
                        return Ok(indentation.chars().count() + 4);
                    }
                    if is_in_non_verbatim_string(&above_text, &current_text, self.verbatim_prefix) {
                        let above = document.line_segment(line - 1)?;
                        document.insert(above.end_offset(), "\" +")?;
                        let current = document.line_segment(line)?;
                        document.insert(current.offset, "\"")?;
                        caret_shift = 1;
                        debug!(target: "format.indent", line, "string_split");
                    }
                }
                LexState::Code | LexState::VerbatimString => {}
            }
        }

        let caret = self.indent_line(document, line)? + caret_shift;

        let properties = document.properties().clone();
        if properties.auto_insert_curly_bracket
            && line > 0
            && document.line_text(line - 1)?.trim_end().ends_with('{')
            && need_curly_bracket(&document.text(), self.verbatim_prefix)
        {
            let current = document.line_segment(line)?;
            let closing = format!("{}}}", properties.line_terminator.as_str());
            document.insert(current.end_offset(), &closing)?;
            self.indent_line(document, line + 1)?;
            debug!(target: "format.indent", line, "closing_bracket_inserted");
        }
        Ok(caret)
    }
}

impl Default for CFamilyFormattingStrategy {
    fn default() -> Self {
        Self::csharp()
    }
}

impl FormattingStrategy for CFamilyFormattingStrategy {
    fn smart_indent_line(&self, document: &mut Document, line: usize) -> Result<usize> {
        if line == 0 {
            return self.auto_indent_line(document, line);
        }
        let settings = IndentationSettings {
            leave_empty_lines: false,
            ..IndentationSettings::from_properties(document.properties())
        };
        let mut reformatter = self.reformatter();
        let text = {
            let mut accessor = DocumentAccessor::new(document, line, line);
            reformatter.reformat(&mut accessor, &settings)?;
            accessor.text().to_string()
        };
        // New lines inside a comment or verbatim string keep the previous line's indentation.
        if text.is_empty() && reformatter.in_multi_line_literal_or_comment() {
            return auto_indent_line(document, line);
        }
        Ok(leading_whitespace(&text))
    }

    fn indent_lines(&self, document: &mut Document, begin: usize, end: usize) -> Result<()> {
        if document.properties().indent_style != IndentStyle::Smart {
            return indent_each_line(self, document, begin, end);
        }
        let settings = IndentationSettings::from_properties(document.properties());
        let mut reformatter = self.reformatter();
        document.undo_group(|doc| {
            let mut accessor = DocumentAccessor::new(doc, begin, end);
            reformatter.reformat(&mut accessor, &settings)?;
            debug!(target: "format.indent", begin, end, changed = accessor.changed_lines(), "indent_lines");
            Ok(())
        })
    }

    fn format_line(
        &self,
        document: &mut Document,
        line: usize,
        caret_offset: usize,
        ch: char,
    ) -> Result<Option<usize>> {
        trace!(target: "format.indent", line, caret_offset, ?ch, "format_line");
        document.undo_group(|doc| self.format_line_in_group(doc, line, caret_offset, ch))
    }

    fn search_bracket_backward(
        &self,
        document: &Document,
        offset: usize,
        open: char,
        close: char,
    ) -> Option<usize> {
        if offset >= document.text_length() {
            return None;
        }
        if let Some(found) = quick_search_bracket_backward(document, offset, open, close)
            && self.start_type_at(document, found).ok()? == StartType::Code
        {
            return Some(found);
        }
        if self.start_type_at(document, offset + 1).ok()? != StartType::Code {
            return None;
        }
        let found = scan_backward(document.chars_from(0).ok()?, offset, open, close, self.verbatim_prefix);
        trace!(target: "format.brackets", offset, ?found, "full_backward_scan");
        found
    }

    fn search_bracket_forward(
        &self,
        document: &Document,
        offset: usize,
        open: char,
        close: char,
    ) -> Option<usize> {
        if let Some(found) = quick_search_bracket_forward(document, offset, open, close) {
            return Some(found);
        }
        if self.start_type_at(document, offset).ok()? != StartType::Code {
            return None;
        }
        let chars = document.chars_from(offset).ok()?;
        let found = scan_forward(chars, offset, open, close, self.verbatim_prefix);
        trace!(target: "format.brackets", offset, ?found, "full_forward_scan");
        found
    }
}

/// Insert the end tag for the XML tag whose `>` was just typed before `column`.
fn close_xml_tag(document: &mut Document, text: &str, column: usize, caret_offset: usize) -> Result<()> {
    let chars: Vec<char> = text.chars().collect();
    let Some(mut index) = column.min(chars.len()).checked_sub(1) else {
        return Ok(());
    };
    while chars[index] != '<' {
        let Some(previous) = index.checked_sub(1) else {
            return Ok(());
        };
        index = previous;
        // An end tag, or a tag that is already closed.
        if chars[index] == '/' {
            return Ok(());
        }
    }
    if index == 0 {
        return Ok(());
    }
    let mut tag: String = chars[index..column.min(chars.len())]
        .iter()
        .take_while(|ch| !ch.is_whitespace())
        .collect();
    if !tag.ends_with('>') {
        tag.push('>');
    }
    document.insert(caret_offset, &format!("</{}", &tag[1..]))
}

fn leading_whitespace(text: &str) -> usize {
    text.chars().take_while(|ch| ch.is_whitespace()).count()
}

fn char_index(text: &str, pattern: &str) -> Option<usize> {
    text.find(pattern).map(|byte| text[..byte].chars().count())
}

/// Indentation of `line`, padded with spaces up to `column`.
fn padded_indentation(document: &Document, line: usize, column: usize) -> Result<String> {
    let mut indentation = get_indentation(document, line)?;
    let width = indentation.chars().count();
    indentation.extend(std::iter::repeat_n(' ', column.saturating_sub(width)));
    Ok(indentation)
}

fn replace_line(document: &mut Document, line: usize, text: &str) -> Result<()> {
    let segment = document.line_segment(line)?;
    document.replace(segment.offset, segment.length, text)
}
