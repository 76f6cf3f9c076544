//! Line/column coordinates.

use std::fmt;

/// A `(line, column)` location, both 0-based and measured in characters.
///
/// Ordering is lexicographic: first by line, then by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextLocation {
    /// Line index.
    pub line: usize,
    /// Column in characters.
    pub column: usize,
}

impl TextLocation {
    /// Create a location.
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of the document.
    pub const fn zero() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.column)
    }
}
