//! [`FoldingStrategy`] for brace languages.
//!
//! Three kinds of folds are produced:
//!
//! - type bodies: a `{ ... }` that follows one of the strategy's block keywords (`class`,
//!   `struct`, `technique`, ...); the scan continues inside the body, so members get folds too;
//! - method bodies: any other `{ ... }` spanning lines that is not followed by `;`; its inside is
//!   not searched further;
//! - `#region` / `#endregion` pairs, which start folded and show the region's label.
//!
//! Brackets inside comments and literals are ignored. Folds that would partially overlap an
//! earlier one (a region cutting through a method, say) are dropped.

use crate::scanner::{CSHARP_VERBATIM_PREFIX, CodeScanner, LexState};
use regex::Regex;
use std::cmp::Reverse;
use textedit_core::{Document, Fold, FoldingStrategy, TextBuffer};
use tracing::trace;

const BODY_FOLD_TEXT: &str = "{...}";

/// Keywords that introduce a foldable type body in C#.
pub const CSHARP_BLOCK_KEYWORDS: [&str; 5] = ["class", "enum", "interface", "namespace", "struct"];

/// Keywords that introduce a foldable body in HLSL effect files.
pub const HLSL_BLOCK_KEYWORDS: [&str; 15] = [
    "asm",
    "BlendState",
    "cbuffer",
    "DepthStencilState",
    "interface",
    "pass",
    "RasterizerState",
    "struct",
    "sampler_state",
    "stateblock_state",
    "SamplerState",
    "SamplerComparisonState",
    "tbuffer",
    "technique",
    "technique10",
];

#[derive(Debug, Clone)]
struct RegionPatterns {
    start: Regex,
    end: Regex,
}

impl RegionPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(r"^\s*#\s*region\b(.*)$")?,
            end: Regex::new(r"^\s*#\s*endregion\b")?,
        })
    }
}

/// Folds type bodies, method bodies and regions.
#[derive(Debug, Clone)]
pub struct CFamilyFoldingStrategy {
    block_keywords: Vec<String>,
    verbatim_prefix: Option<char>,
    regions: Option<RegionPatterns>,
}

impl CFamilyFoldingStrategy {
    /// A strategy folding the bodies introduced by `block_keywords`, plus `#region`s if
    /// `regions` is set.
    pub fn new<I, S>(block_keywords: I, verbatim_prefix: Option<char>, regions: bool) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            block_keywords: block_keywords.into_iter().map(Into::into).collect(),
            verbatim_prefix,
            regions: regions.then(RegionPatterns::new).transpose()?,
        })
    }

    /// C#: type bodies, method bodies and regions.
    pub fn csharp() -> Result<Self, regex::Error> {
        Self::new(CSHARP_BLOCK_KEYWORDS, Some(CSHARP_VERBATIM_PREFIX), true)
    }

    /// HLSL: technique, pass, state and buffer bodies, plus functions.
    pub fn hlsl() -> Result<Self, regex::Error> {
        Self::new(HLSL_BLOCK_KEYWORDS, None, false)
    }

    fn is_block_keyword(&self, word: &[char]) -> bool {
        self.block_keywords
            .iter()
            .any(|keyword| keyword.chars().eq(word.iter().copied()))
    }

    fn body_folds(&self, buffer: &TextBuffer, text: &LexedText) -> Vec<Fold> {
        let chars = &text.chars;
        let mut folds = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if !text.code[i] {
                i += 1;
                continue;
            }
            let ch = chars[i];
            if is_identifier_start(ch) && (i == 0 || !is_identifier_char(chars[i - 1])) {
                let end = i + chars[i..].iter().take_while(|&&c| is_identifier_char(c)).count();
                if self.is_block_keyword(&chars[i..end])
                    && let Some(open) = text.body_start(end)
                {
                    if let Some(close) = text.matching_close(open) {
                        folds.extend(body_fold(buffer, chars, open, close));
                    }
                    i = open + 1;
                } else {
                    i = end;
                }
                continue;
            }
            if ch == '{' {
                match text.matching_close(i) {
                    Some(close) if text.next_significant(close + 1) != Some(';') => {
                        folds.extend(body_fold(buffer, chars, i, close));
                        i = close + 1;
                    }
                    _ => i += 1,
                }
                continue;
            }
            i += 1;
        }
        folds
    }

    fn region_folds(&self, document: &Document, text: &LexedText) -> Vec<Fold> {
        let Some(patterns) = &self.regions else {
            return Vec::new();
        };
        let mut folds = Vec::new();
        let mut open: Vec<(usize, String)> = Vec::new();
        for segment in document.line_segments() {
            if text.block_comment_at(segment.offset) {
                continue;
            }
            let Ok(line) = document.line_text(segment.line_number) else {
                continue;
            };
            if let Some(captures) = patterns.start.captures(&line) {
                let hash = line.chars().take_while(|ch| *ch != '#').count();
                let label = captures.get(1).map_or("", |label| label.as_str().trim());
                let label = if label.is_empty() { "#region" } else { label };
                open.push((segment.offset + hash, label.to_string()));
            } else if patterns.end.is_match(&line)
                && let Some((start, label)) = open.pop()
            {
                let end = segment.end_offset();
                folds.extend(Fold::new(document.buffer(), start, end - start, label, true).ok());
            }
        }
        folds
    }
}

impl FoldingStrategy for CFamilyFoldingStrategy {
    fn generate_folds(&self, document: &Document, file_name: Option<&str>) -> Vec<Fold> {
        let text = LexedText::new(document, self.verbatim_prefix);
        let mut folds = self.body_folds(document.buffer(), &text);
        folds.extend(self.region_folds(document, &text));
        let generated = folds.len();
        let folds = drop_partial_overlaps(folds);
        trace!(
            target: "folding.cfamily",
            file = file_name.unwrap_or(""),
            generated,
            kept = folds.len(),
            "generate_folds"
        );
        folds
    }
}

/// Document text with a code/non-code flag per character.
struct LexedText {
    chars: Vec<char>,
    code: Vec<bool>,
    /// Offsets of line starts that lie inside a block comment.
    commented_line_starts: Vec<usize>,
}

impl LexedText {
    fn new(document: &Document, verbatim_prefix: Option<char>) -> Self {
        let chars: Vec<char> = document.text().chars().collect();
        let mut scanner = CodeScanner::new(verbatim_prefix);
        let mut code = Vec::with_capacity(chars.len());
        let mut commented_line_starts = Vec::new();
        for (i, &ch) in chars.iter().enumerate() {
            let line_start = match i.checked_sub(1).map(|p| chars[p]) {
                None | Some('\n') => true,
                Some('\r') => ch != '\n',
                Some(_) => false,
            };
            if line_start && scanner.state() == LexState::BlockComment {
                commented_line_starts.push(i);
            }
            let counted = scanner.advance(ch, chars.get(i + 1).copied());
            code.push(counted && scanner.in_code());
        }
        Self {
            chars,
            code,
            commented_line_starts,
        }
    }

    fn block_comment_at(&self, offset: usize) -> bool {
        self.commented_line_starts.binary_search(&offset).is_ok()
    }

    /// The `{` opening the body after a block keyword, unless a `}` or `;` comes first.
    fn body_start(&self, from: usize) -> Option<usize> {
        (from..self.chars.len())
            .filter(|&i| self.code[i])
            .find(|&i| matches!(self.chars[i], '{' | '}' | ';'))
            .filter(|&i| self.chars[i] == '{')
    }

    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.chars.len() {
            if !self.code[i] {
                continue;
            }
            match self.chars[i] {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn next_significant(&self, from: usize) -> Option<char> {
        self.chars
            .get(from..)?
            .iter()
            .copied()
            .find(|ch| !ch.is_whitespace())
    }
}

/// Fold from the end of the text before `open` to `close` inclusive, if it spans lines.
fn body_fold(buffer: &TextBuffer, chars: &[char], open: usize, close: usize) -> Option<Fold> {
    let start = open - chars[..open].iter().rev().take_while(|ch| ch.is_whitespace()).count();
    let fold = Fold::new(buffer, start, close + 1 - start, BODY_FOLD_TEXT, false).ok()?;
    (fold.end_line() > fold.start_line()).then_some(fold)
}

/// Sort `folds` and drop every fold that crosses the boundary of one kept before it.
fn drop_partial_overlaps(mut folds: Vec<Fold>) -> Vec<Fold> {
    folds.sort_by_key(|fold| (fold.offset(), Reverse(fold.length())));
    let mut kept: Vec<Fold> = Vec::with_capacity(folds.len());
    let mut enclosing: Vec<usize> = Vec::new();
    for fold in folds {
        while let Some(&outer) = enclosing.last()
            && kept[outer].end_offset() <= fold.offset()
        {
            enclosing.pop();
        }
        if let Some(&outer) = enclosing.last()
            && fold.end_offset() > kept[outer].end_offset()
        {
            continue;
        }
        enclosing.push(kept.len());
        kept.push(fold);
    }
    kept
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn folds(strategy: &CFamilyFoldingStrategy, text: &str) -> Vec<(usize, usize, String, bool)> {
        let doc = Document::from_text(text);
        strategy
            .generate_folds(&doc, None)
            .iter()
            .map(|fold| (fold.start_line(), fold.end_line(), fold.fold_text().to_string(), fold.is_folded()))
            .collect()
    }

    #[test]
    fn test_class_and_method_bodies() {
        let text = "namespace N\n{\n\tclass A\n\t{\n\t\tvoid F()\n\t\t{\n\t\t\tif (x) {\n\t\t\t}\n\t\t}\n\t}\n}\n";
        let strategy = CFamilyFoldingStrategy::csharp().unwrap();
        assert_eq!(
            folds(&strategy, text),
            vec![
                (0, 10, "{...}".to_string(), false),
                (2, 9, "{...}".to_string(), false),
                (4, 8, "{...}".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_fold_starts_after_header() {
        let doc = Document::from_text("class A\n{\n}");
        let strategy = CFamilyFoldingStrategy::csharp().unwrap();
        let folds = strategy.generate_folds(&doc, Some("a.cs"));
        assert_eq!(folds.len(), 1);
        assert_eq!((folds[0].offset(), folds[0].length()), (7, 4));
    }

    #[test]
    fn test_initializers_and_comments_are_skipped() {
        let text = "int[] a = {\n1\n};\n// class X {\n/* {\n} */\nstring s = \"{\n\";";
        let strategy = CFamilyFoldingStrategy::csharp().unwrap();
        assert_eq!(folds(&strategy, text), Vec::new());
    }

    #[test]
    fn test_regions() {
        let text = "#region Fields\nint a;\n  #region\nint b;\n  #endregion\n#endregion\n/*\n#region X\n*/";
        let strategy = CFamilyFoldingStrategy::csharp().unwrap();
        assert_eq!(
            folds(&strategy, text),
            vec![(0, 5, "Fields".to_string(), true), (2, 4, "#region".to_string(), true)]
        );
    }

    #[test]
    fn test_hlsl_keywords_without_regions() {
        let text = "technique T\n{\n\tpass P\n\t{\n\t}\n}\n#region R\n#endregion";
        let strategy = CFamilyFoldingStrategy::hlsl().unwrap();
        assert_eq!(
            folds(&strategy, text),
            vec![(0, 5, "{...}".to_string(), false), (2, 4, "{...}".to_string(), false)]
        );
    }

    #[test]
    fn test_partial_overlaps_are_dropped() {
        let text = "#region R\nvoid F()\n{\n#endregion\n}";
        let strategy = CFamilyFoldingStrategy::csharp().unwrap();
        assert_eq!(folds(&strategy, text), vec![(0, 3, "R".to_string(), true)]);
    }
}
