//! Editor properties.
//!
//! Parsed from TOML. Every field has a default and unknown keys are ignored, so a partial file
//! such as
//!
//! ```toml
//! indent_style = "auto"
//! convert_tabs_to_spaces = true
//! indentation_size = 2
//! ```
//!
//! is valid.

use crate::error::Result;
use crate::line_ending::LineEnding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// How a new line is indented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    /// Leave the line alone.
    None,
    /// Copy the previous line's indentation.
    Auto,
    /// Ask the formatting strategy.
    #[default]
    Smart,
}

/// Settings consulted by the document and its strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorProperties {
    /// Indentation mode for new lines.
    pub indent_style: IndentStyle,
    /// Indent with spaces instead of tabs.
    pub convert_tabs_to_spaces: bool,
    /// Width of one indentation unit in spaces.
    pub indentation_size: usize,
    /// Display width of a tab.
    pub tab_indent: usize,
    /// Terminator used for line breaks the engine inserts itself.
    pub line_terminator: LineEnding,
    /// Insert the closing `}` after a line ending in `{`.
    pub auto_insert_curly_bracket: bool,
    /// Run the folding strategy.
    pub enable_folding: bool,
    /// Keep blank lines empty when reformatting.
    pub leave_empty_lines: bool,
}

impl Default for EditorProperties {
    fn default() -> Self {
        Self {
            indent_style: IndentStyle::Smart,
            convert_tabs_to_spaces: false,
            indentation_size: 4,
            tab_indent: 4,
            line_terminator: LineEnding::Lf,
            auto_insert_curly_bracket: true,
            enable_folding: true,
            leave_empty_lines: true,
        }
    }
}

impl EditorProperties {
    /// Parse properties from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load properties from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let properties = Self::from_toml_str(&text)?;
        debug!(target: "document.config", path = %path.display(), "properties_loaded");
        Ok(properties)
    }

    /// One indentation unit: spaces when tabs are converted, else a tab.
    pub fn indentation_string(&self) -> String {
        if self.convert_tabs_to_spaces {
            " ".repeat(self.indentation_size)
        } else {
            "\t".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let properties = EditorProperties::default();
        assert_eq!(properties.indent_style, IndentStyle::Smart);
        assert_eq!(properties.indentation_string(), "\t");
        assert!(properties.leave_empty_lines);
    }

    #[test]
    fn test_partial_toml_with_unknown_keys() {
        let properties = EditorProperties::from_toml_str(
            r#"
            indent_style = "auto"
            convert_tabs_to_spaces = true
            indentation_size = 2
            line_terminator = "crlf"
            font = "Consolas"
            "#,
        )
        .unwrap();
        assert_eq!(properties.indent_style, IndentStyle::Auto);
        assert_eq!(properties.indentation_string(), "  ");
        assert_eq!(properties.line_terminator, LineEnding::Crlf);
        assert_eq!(properties.tab_indent, 4);
        assert!(properties.auto_insert_curly_bracket);
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = EditorProperties::from_toml_str("indentation_size = \"wide\"").unwrap_err();
        assert!(matches!(err, crate::DocumentError::Config(_)));
    }
}
