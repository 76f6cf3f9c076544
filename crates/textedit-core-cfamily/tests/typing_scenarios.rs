use pretty_assertions::assert_eq;
use std::sync::Arc;
use textedit_core::{Document, EditorProperties, IndentStyle};
use textedit_core_cfamily::CFamilyFormattingStrategy;

fn csharp(text: &str) -> Document {
    let mut doc = Document::from_text(text);
    CFamilyFormattingStrategy::csharp().attach(&mut doc);
    doc
}

/// Type `text` at the end of the document, then press Enter.
fn type_line(doc: &mut Document, text: &str) -> Option<usize> {
    let end = doc.text_length();
    doc.insert(end, text).unwrap();
    let end = doc.text_length();
    doc.insert(end, "\n").unwrap();
    let line = doc.line_count() - 1;
    let caret = doc.text_length();
    doc.format_line(line, caret, '\n').unwrap()
}

#[test]
fn test_one_line_if_at_top_level() {
    let mut doc = csharp("");
    assert_eq!(type_line(&mut doc, "if (x)"), Some(1));
    assert_eq!(doc.text(), "if (x)\n\t");

    assert_eq!(type_line(&mut doc, "y();"), Some(0));
    assert_eq!(doc.text(), "if (x)\n\ty();\n");
}

#[test]
fn test_one_line_if_in_method() {
    let mut doc = csharp("void F()\n{\n\tif (x)\n");
    assert_eq!(doc.format_line(3, doc.text_length(), '\n').unwrap(), Some(2));
    assert_eq!(doc.line_text(3).unwrap(), "\t\t");

    assert_eq!(type_line(&mut doc, "y();"), Some(1));
    assert_eq!(doc.line_text(3).unwrap(), "\t\ty();");
    assert_eq!(doc.line_text(4).unwrap(), "\t");
}

#[test]
fn test_typed_paren_keeps_indentation() {
    let mut doc = csharp("void F()\n{\n\tif (x)\n\t\ty()");
    let caret = doc.text_length();
    assert_eq!(doc.format_line(3, caret, ')').unwrap(), Some(5));
    assert_eq!(doc.line_text(3).unwrap(), "\t\ty()");
}

#[test]
fn test_closing_brace_is_inserted() {
    let mut doc = csharp("void F() {\n");
    assert_eq!(doc.format_line(1, 11, '\n').unwrap(), Some(1));
    assert_eq!(doc.text(), "void F() {\n\t\n}");

    let mut doc = csharp("void F() {\n");
    doc.set_properties(EditorProperties {
        auto_insert_curly_bracket: false,
        ..EditorProperties::default()
    });
    assert_eq!(doc.format_line(1, 11, '\n').unwrap(), Some(1));
    assert_eq!(doc.text(), "void F() {\n\t");
}

#[test]
fn test_endregion_is_inserted() {
    let mut doc = csharp("#region Foo\n");
    assert_eq!(doc.format_line(1, 12, '\n').unwrap(), Some(0));
    assert_eq!(doc.text(), "#region Foo\n#endregion");

    let mut doc = csharp("#region Foo\n#endregion\n#region Bar\n\n#endregion");
    doc.format_line(3, 35, '\n').unwrap();
    assert_eq!(doc.line_text(3).unwrap(), "");
}

#[test]
fn test_string_broken_by_enter() {
    let mut doc = csharp("x = \"abc\ndef\";");
    assert_eq!(doc.format_line(1, 9, '\n').unwrap(), Some(2));
    assert_eq!(doc.text(), "x = \"abc\" +\n\t\"def\";");
    assert!(doc.undo().unwrap());
    assert_eq!(doc.text(), "x = \"abc\ndef\";");
}

#[test]
fn test_doc_comment_continues() {
    let mut doc = csharp("\t/// summary\n");
    assert_eq!(doc.format_line(1, 13, '\n').unwrap(), Some(5));
    assert_eq!(doc.text(), "\t/// summary\n\t/// ");
}

#[test]
fn test_block_comment_continues() {
    let mut doc = csharp("\t/* start\n");
    assert_eq!(doc.format_line(1, 10, '\n').unwrap(), Some(4));
    assert_eq!(doc.text(), "\t/* start\n\t * ");

    assert_eq!(type_line(&mut doc, "more"), Some(4));
    assert_eq!(doc.text(), "\t/* start\n\t * more\n\t * ");
}

#[test]
fn test_enter_sees_edits_to_earlier_lines() {
    let mut doc = csharp("\t/* start\n");
    assert_eq!(doc.format_line(1, 10, '\n').unwrap(), Some(4));
    assert!(doc.undo().unwrap());
    assert_eq!(doc.text(), "\t/* start\n");

    // Close the comment on the line above, then press Enter again.
    doc.insert(9, " */").unwrap();
    assert_eq!(doc.format_line(1, 13, '\n').unwrap(), Some(0));
    assert_eq!(doc.text(), "\t/* start */\n");
}

#[test]
fn test_detached_strategy_agrees_with_attached_one() {
    let text = "class A\n{\n\t/* a\n\t * b */\n\tstring s = @\"x\ny\";\n";
    let mut attached = csharp(text);
    let mut detached = Document::from_text(text);
    detached.set_formatting_strategy(Arc::new(CFamilyFormattingStrategy::csharp()));
    for doc in [&mut attached, &mut detached] {
        let end = doc.text_length();
        doc.insert(end, "\n").unwrap();
        let caret = doc.text_length();
        doc.format_line(7, caret, '\n').unwrap();
        doc.insert(16, "/*").unwrap();
        let caret = doc.line_segment(3).unwrap().offset;
        doc.format_line(3, caret, '\n').unwrap();
    }
    assert_eq!(attached.text(), detached.text());
}

#[test]
fn test_xml_tag_is_closed() {
    let mut doc = csharp("/// <summary>");
    assert_eq!(doc.format_line(0, 13, '>').unwrap(), None);
    assert_eq!(doc.text(), "/// <summary></summary>");
}

#[test]
fn test_auto_indent_style_copies_previous_line() {
    let mut doc = csharp("\tif (x)\n");
    doc.set_properties(EditorProperties {
        indent_style: IndentStyle::Auto,
        ..EditorProperties::default()
    });
    assert_eq!(doc.format_line(1, 8, '\n').unwrap(), Some(1));
    assert_eq!(doc.text(), "\tif (x)\n\t");
    assert_eq!(doc.format_line(1, 9, '}').unwrap(), None);
}

#[test]
fn test_indent_lines_reformats_range() {
    let mut doc = csharp("class A\n{\nvoid F()\n{\nx();\n}\n}");
    doc.indent_lines(0, 6).unwrap();
    assert_eq!(doc.text(), "class A\n{\n\tvoid F()\n\t{\n\t\tx();\n\t}\n}");
    assert!(doc.undo().unwrap());
    assert_eq!(doc.text(), "class A\n{\nvoid F()\n{\nx();\n}\n}");
}

#[test]
fn test_indent_lines_with_spaces() {
    let mut doc = csharp("{\nx();\n}");
    doc.set_properties(EditorProperties {
        convert_tabs_to_spaces: true,
        indentation_size: 2,
        ..EditorProperties::default()
    });
    doc.indent_lines(1, 1).unwrap();
    assert_eq!(doc.text(), "{\n  x();\n}");
}
