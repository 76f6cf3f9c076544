use pretty_assertions::assert_eq;
use std::fs;
use textedit_core::{DocumentError, EditorProperties, IndentStyle, LineEnding, TextEncoding, TextFile};

#[test]
fn test_save_untouched_document_reproduces_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let cases: [&[u8]; 4] = [
        b"no terminator",
        b"crlf\r\nlines\r\n",
        b"\xEF\xBB\xBFbom\nmixed\r\nold mac\rend",
        b"",
    ];
    for (i, bytes) in cases.iter().enumerate() {
        let path = dir.path().join(format!("case{i}.txt"));
        fs::write(&path, bytes).unwrap();
        let (file, doc) = TextFile::load(&path).unwrap();
        let out = dir.path().join(format!("case{i}.out"));
        file.save(&doc, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), *bytes);
    }
}

#[test]
fn test_edits_keep_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utf16.txt");
    let mut bytes = vec![0xFE, 0xFF];
    for unit in "a\r\nb".encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    fs::write(&path, &bytes).unwrap();

    let (file, mut doc) = TextFile::load(&path).unwrap();
    assert_eq!(file.encoding, TextEncoding::Utf16Be);
    assert_eq!(doc.line_count(), 2);
    doc.insert(1, "!").unwrap();
    file.save(&doc, &path).unwrap();

    let (_, reloaded) = TextFile::load(&path).unwrap();
    assert_eq!(reloaded.text(), "a!\r\nb");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TextFile::load(dir.path().join("missing.txt")),
        Err(DocumentError::Io(_))
    ));
    assert!(matches!(
        EditorProperties::load(dir.path().join("missing.toml")),
        Err(DocumentError::Io(_))
    ));
}

#[test]
fn test_properties_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("editor.toml");
    fs::write(
        &path,
        "indent_style = \"auto\"\nconvert_tabs_to_spaces = true\nindentation_size = 2\nline_terminator = \"crlf\"\nunknown_key = 1\n",
    )
    .unwrap();
    let properties = EditorProperties::load(&path).unwrap();
    assert_eq!(properties.indent_style, IndentStyle::Auto);
    assert_eq!(properties.indentation_string(), "  ");
    assert_eq!(properties.line_terminator, LineEnding::Crlf);
    assert!(properties.enable_folding);

    fs::write(&path, "indentation_size = \"four\"").unwrap();
    assert!(matches!(
        EditorProperties::load(&path),
        Err(DocumentError::Config(_))
    ));
}
