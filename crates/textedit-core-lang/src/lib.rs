#![warn(missing_docs)]
//! `textedit-core-lang` - data-only language configuration for `textedit-core`.
//!
//! Nothing in here scans text. The structs describe the lexical tokens a language uses
//! (comment markers, bracket pairs, preprocessor prefix) so that the document engine and the
//! formatting strategies can stay language-agnostic and be configured by the host.

/// Comment tokens for a language.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentConfig {
    /// Line comment token (e.g. `//`, `#`).
    pub line: Option<String>,
    /// Block comment start token (e.g. `/*`).
    pub block_start: Option<String>,
    /// Block comment end token (e.g. `*/`).
    pub block_end: Option<String>,
    /// Documentation comment prefix (e.g. `///`), if the language has one.
    pub doc_line: Option<String>,
}

impl CommentConfig {
    /// Line comments only.
    pub fn line(token: impl Into<String>) -> Self {
        Self {
            line: Some(token.into()),
            ..Self::default()
        }
    }

    /// Line comments plus a `start ... end` block comment pair.
    pub fn line_and_block(
        line: impl Into<String>,
        block_start: impl Into<String>,
        block_end: impl Into<String>,
    ) -> Self {
        Self {
            line: Some(line.into()),
            block_start: Some(block_start.into()),
            block_end: Some(block_end.into()),
            doc_line: None,
        }
    }

    /// Attach a documentation-comment prefix.
    pub fn with_doc_line(mut self, token: impl Into<String>) -> Self {
        self.doc_line = Some(token.into());
        self
    }

    /// The configured line comment token, if it is non-empty.
    pub fn line_token(&self) -> Option<&str> {
        self.line.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns `true` if both block comment tokens are configured.
    pub fn has_block(&self) -> bool {
        self.block_start.as_deref().is_some_and(|s| !s.is_empty())
            && self.block_end.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// An opening/closing bracket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPair {
    /// Opening character, e.g. `{`.
    pub open: char,
    /// Closing character, e.g. `}`.
    pub close: char,
}

impl BracketPair {
    /// Create a bracket pair.
    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }

    /// If `ch` is one side of this pair, return the pair's other side.
    pub fn counterpart(&self, ch: char) -> Option<char> {
        if ch == self.open {
            Some(self.close)
        } else if ch == self.close {
            Some(self.open)
        } else {
            None
        }
    }
}

/// Round, square and curly brackets.
pub const C_FAMILY_BRACKETS: [BracketPair; 3] = [
    BracketPair::new('(', ')'),
    BracketPair::new('[', ']'),
    BracketPair::new('{', '}'),
];

/// Lexical description of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Display name, e.g. `"C#"`.
    pub name: String,
    /// File extensions without the dot, lowercase.
    pub extensions: Vec<String>,
    /// Comment tokens.
    pub comments: CommentConfig,
    /// Bracket pairs used for matching and indentation.
    pub brackets: Vec<BracketPair>,
    /// Verbatim string prefix (`@` in C#), if any.
    pub verbatim_string_prefix: Option<char>,
}

impl LanguageConfig {
    /// C# (`//`, `/* */`, `///`, `@"..."` verbatim strings).
    pub fn csharp() -> Self {
        Self {
            name: "C#".to_string(),
            extensions: vec!["cs".to_string()],
            comments: CommentConfig::line_and_block("//", "/*", "*/").with_doc_line("///"),
            brackets: C_FAMILY_BRACKETS.to_vec(),
            verbatim_string_prefix: Some('@'),
        }
    }

    /// HLSL / effect files.
    pub fn hlsl() -> Self {
        Self {
            name: "HLSL".to_string(),
            extensions: vec!["fx".to_string(), "fxh".to_string(), "hlsl".to_string()],
            comments: CommentConfig::line_and_block("//", "/*", "*/"),
            brackets: C_FAMILY_BRACKETS.to_vec(),
            verbatim_string_prefix: None,
        }
    }

    /// Find a preset by file extension (case-insensitive).
    pub fn for_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        [Self::csharp(), Self::hlsl()]
            .into_iter()
            .find(|cfg| cfg.extensions.iter().any(|e| *e == ext))
    }

    /// The bracket pair that `ch` belongs to, if any.
    pub fn bracket_pair_for(&self, ch: char) -> Option<BracketPair> {
        self.brackets
            .iter()
            .copied()
            .find(|pair| pair.counterpart(ch).is_some())
    }
}
