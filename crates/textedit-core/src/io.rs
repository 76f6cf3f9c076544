//! Loading and saving documents.
//!
//! The buffer keeps every line terminator as read, and [`TextFile`] remembers the encoding and
//! byte order mark, so writing an untouched document reproduces the input byte for byte.

use crate::document::Document;
use crate::error::{DocumentError, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Character encoding of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
}

impl TextEncoding {
    fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
        }
    }

    fn encode_into(self, text: &str, out: &mut Vec<u8>) {
        match self {
            Self::Utf8 => out.extend_from_slice(text.as_bytes()),
            Self::Utf16Le => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_le_bytes())),
            Self::Utf16Be => text
                .encode_utf16()
                .for_each(|unit| out.extend_from_slice(&unit.to_be_bytes())),
        }
    }
}

/// How a document is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFile {
    /// Encoding.
    pub encoding: TextEncoding,
    /// Whether the file starts with a byte order mark. UTF-16 files always have one.
    pub has_bom: bool,
}

impl TextFile {
    /// Decode `bytes`, detecting the encoding from the byte order mark.
    pub fn decode(bytes: &[u8]) -> Result<(Self, String)> {
        if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
            let file = Self {
                encoding: TextEncoding::Utf8,
                has_bom: true,
            };
            return Ok((file, decode_utf8(rest)?));
        }
        if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
            let file = Self {
                encoding: TextEncoding::Utf16Le,
                has_bom: true,
            };
            return Ok((file, decode_utf16(rest, file.encoding, u16::from_le_bytes)?));
        }
        if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
            let file = Self {
                encoding: TextEncoding::Utf16Be,
                has_bom: true,
            };
            return Ok((file, decode_utf16(rest, file.encoding, u16::from_be_bytes)?));
        }
        Ok((Self::default(), decode_utf8(bytes)?))
    }

    /// Read a whole stream.
    pub fn read(mut reader: impl Read) -> Result<(Self, String)> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    /// Load a file into a new document.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Document)> {
        let path = path.as_ref();
        let (file, text) = Self::read(File::open(path)?)?;
        debug!(
            target: "document.buffer",
            path = %path.display(),
            encoding = file.encoding.name(),
            bom = file.has_bom,
            "file_loaded"
        );
        Ok((file, Document::from_text(&text)))
    }

    /// Write `document` in this file's encoding.
    pub fn write(&self, document: &Document, mut writer: impl Write) -> Result<()> {
        if self.has_bom || self.encoding != TextEncoding::Utf8 {
            match self.encoding {
                TextEncoding::Utf8 => writer.write_all(&UTF8_BOM)?,
                TextEncoding::Utf16Le => writer.write_all(&UTF16_LE_BOM)?,
                TextEncoding::Utf16Be => writer.write_all(&UTF16_BE_BOM)?,
            }
        }
        write_lines(document, &mut writer, self.encoding)?;
        writer.flush()?;
        Ok(())
    }

    /// Save `document` to a file.
    pub fn save(&self, document: &Document, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write(document, BufWriter::new(File::create(path)?))?;
        debug!(target: "document.buffer", path = %path.display(), "file_saved");
        Ok(())
    }
}

/// Write every line followed by its own delimiter.
pub fn write_lines(document: &Document, writer: &mut impl Write, encoding: TextEncoding) -> Result<()> {
    let mut chunk = Vec::new();
    for segment in document.line_segments() {
        chunk.clear();
        let line = document.get_text(segment.offset, segment.total_length())?;
        encoding.encode_into(&line, &mut chunk);
        writer.write_all(&chunk)?;
    }
    Ok(())
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| DocumentError::InvalidEncoding {
        encoding: TextEncoding::Utf8.name(),
    })
}

fn decode_utf16(
    bytes: &[u8],
    encoding: TextEncoding,
    unit: fn([u8; 2]) -> u16,
) -> Result<String> {
    let invalid = || DocumentError::InvalidEncoding {
        encoding: encoding.name(),
    };
    if bytes.len() % 2 != 0 {
        return Err(invalid());
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|_| invalid())
}
