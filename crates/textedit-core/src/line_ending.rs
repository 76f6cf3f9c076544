//! Line terminators.
//!
//! The buffer keeps every terminator exactly as it was typed or loaded. [`LineEnding`] is the
//! sequence used when the engine itself inserts a line break (auto-inserted `}` lines,
//! `#endregion`, ...).

use serde::{Deserialize, Serialize};

/// A line terminator sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac CR (`'\r'`).
    Cr,
}

impl LineEnding {
    /// The terminator text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Length in characters (1 or 2).
    pub fn char_len(self) -> usize {
        match self {
            Self::Crlf => 2,
            Self::Lf | Self::Cr => 1,
        }
    }

    /// Detect the dominant terminator of a text.
    ///
    /// Counts each kind and returns the most frequent one; ties and texts without any line
    /// break resolve to [`LineEnding::Lf`].
    pub fn detect_in_text(text: &str) -> Self {
        let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    crlf += 1;
                }
                '\r' => cr += 1,
                '\n' => lf += 1,
                _ => {}
            }
        }
        if crlf > lf && crlf >= cr {
            Self::Crlf
        } else if cr > lf && cr > crlf {
            Self::Cr
        } else {
            Self::Lf
        }
    }

    /// Rewrite every terminator in `text` to this one.
    pub fn apply_to_text(self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str(self.as_str());
                }
                '\n' => out.push_str(self.as_str()),
                other => out.push(other),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_dominant_terminator() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb\r\nc\n"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect_in_text("a\rb\rc"), LineEnding::Cr);
        assert_eq!(LineEnding::detect_in_text("no breaks"), LineEnding::Lf);
    }

    #[test]
    fn test_apply_normalizes_mixed_input() {
        assert_eq!(LineEnding::Crlf.apply_to_text("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(LineEnding::Lf.apply_to_text("a\r\nb"), "a\nb");
    }
}
