//! Line-by-line access for the reformatter.
//!
//! The reformatter walks lines through [`LineAccessor`] so the same pass can run over a live
//! [`Document`] or over a plain string.

use textedit_core::{Document, LineSegment, Result};
use tracing::trace;

/// A cursor over lines whose text may be rewritten.
pub trait LineAccessor {
    /// Returns `true` if the current line must not be changed.
    fn is_read_only(&self) -> bool;

    /// Number of the current line.
    fn line_number(&self) -> usize;

    /// Text of the current line, without its delimiter.
    fn text(&self) -> &str;

    /// Replace the text of the current line. Ignored on read-only lines.
    fn set_text(&mut self, text: String);

    /// Move to the next line. Returns `false` once there is none.
    fn next(&mut self) -> Result<bool>;
}

/// Accessor over lines `0..=max_line` of a document, of which only `min_line..=max_line` may be
/// changed.
///
/// The earlier lines are walked read-only so the reformatter sees the code that encloses the
/// range.
pub struct DocumentAccessor<'a> {
    document: &'a mut Document,
    min_line: usize,
    max_line: usize,
    line: Option<usize>,
    segment: Option<LineSegment>,
    text: String,
    dirty: bool,
    changed_lines: usize,
}

impl<'a> DocumentAccessor<'a> {
    /// Create an accessor positioned before line 0.
    pub fn new(document: &'a mut Document, min_line: usize, max_line: usize) -> Self {
        Self {
            document,
            min_line,
            max_line,
            line: None,
            segment: None,
            text: String::new(),
            dirty: false,
            changed_lines: 0,
        }
    }

    /// Number of lines rewritten so far.
    pub fn changed_lines(&self) -> usize {
        self.changed_lines
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(segment) = self.segment
            && self.dirty
        {
            self.document.replace(segment.offset, segment.length, &self.text)?;
            self.changed_lines += 1;
            self.dirty = false;
        }
        Ok(())
    }
}

impl LineAccessor for DocumentAccessor<'_> {
    fn is_read_only(&self) -> bool {
        self.line.is_none_or(|line| line < self.min_line)
    }

    fn line_number(&self) -> usize {
        self.line.unwrap_or(0)
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn set_text(&mut self, text: String) {
        if self.is_read_only() || text == self.text {
            return;
        }
        self.text = text;
        self.dirty = true;
    }

    fn next(&mut self) -> Result<bool> {
        self.flush()?;
        let line = self.line.map_or(0, |line| line + 1);
        if line > self.max_line || line >= self.document.line_count() {
            if self.changed_lines > 0 {
                trace!(target: "format.indent", lines = self.changed_lines, "accessor_done");
            }
            return Ok(false);
        }
        let segment = self.document.line_segment(line)?;
        self.text = self.document.line_text(line)?;
        self.segment = Some(segment);
        self.line = Some(line);
        Ok(true)
    }
}

/// Accessor over the lines of a string. Every line is writable.
///
/// Line delimiters are kept as found, so [`StringAccessor::into_output`] only differs from the
/// input where lines were rewritten.
#[derive(Debug, Clone)]
pub struct StringAccessor {
    lines: Vec<(String, &'static str)>,
    current: Option<usize>,
}

impl StringAccessor {
    /// Split `text` into lines.
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let (line, delimiter, tail) = match rest.find(['\r', '\n']) {
                Some(i) if rest[i..].starts_with("\r\n") => (&rest[..i], "\r\n", &rest[i + 2..]),
                Some(i) if rest[i..].starts_with('\r') => (&rest[..i], "\r", &rest[i + 1..]),
                Some(i) => (&rest[..i], "\n", &rest[i + 1..]),
                None => (rest, "", ""),
            };
            lines.push((line.to_string(), delimiter));
            rest = tail;
        }
        Self {
            lines,
            current: None,
        }
    }

    /// Reassemble the lines.
    pub fn into_output(self) -> String {
        self.lines
            .into_iter()
            .flat_map(|(line, delimiter)| [line, delimiter.to_string()])
            .collect()
    }
}

impl LineAccessor for StringAccessor {
    fn is_read_only(&self) -> bool {
        false
    }

    fn line_number(&self) -> usize {
        self.current.unwrap_or(0)
    }

    fn text(&self) -> &str {
        self.current
            .and_then(|i| self.lines.get(i))
            .map_or("", |(line, _)| line.as_str())
    }

    fn set_text(&mut self, text: String) {
        if let Some(entry) = self.current.and_then(|i| self.lines.get_mut(i)) {
            entry.0 = text;
        }
    }

    fn next(&mut self) -> Result<bool> {
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.lines.len() {
            return Ok(false);
        }
        self.current = Some(next);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(accessor: &mut impl LineAccessor) -> Vec<String> {
        let mut lines = Vec::new();
        while accessor.next().unwrap() {
            lines.push(accessor.text().to_string());
        }
        lines
    }

    #[test]
    fn test_string_accessor_keeps_delimiters() {
        let mut accessor = StringAccessor::new("a\r\nb\rc\n");
        assert_eq!(drain(&mut accessor), vec!["a", "b", "c"]);
        assert_eq!(accessor.into_output(), "a\r\nb\rc\n");
        assert!(!StringAccessor::new("").next().unwrap());
    }

    #[test]
    fn test_string_accessor_rewrites() {
        let mut accessor = StringAccessor::new("x\ny");
        accessor.next().unwrap();
        accessor.next().unwrap();
        accessor.set_text("\ty".to_string());
        assert_eq!(accessor.line_number(), 1);
        assert_eq!(accessor.into_output(), "x\n\ty");
    }

    #[test]
    fn test_document_accessor_range() {
        let mut doc = Document::from_text("a\r\nb\nc\nd");
        let mut accessor = DocumentAccessor::new(&mut doc, 1, 2);
        let mut seen = Vec::new();
        while accessor.next().unwrap() {
            seen.push((accessor.line_number(), accessor.is_read_only()));
            let text = format!("> {}", accessor.text());
            accessor.set_text(text);
        }
        assert_eq!(seen, vec![(0, true), (1, false), (2, false)]);
        assert_eq!(accessor.changed_lines(), 2);
        assert_eq!(doc.text(), "a\r\n> b\n> c\nd");
    }
}
