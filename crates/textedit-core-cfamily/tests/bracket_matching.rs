use pretty_assertions::assert_eq;
use std::sync::Arc;
use textedit_core::{Document, FormattingStrategy, LanguageConfig, goto_matching_bracket};
use textedit_core_cfamily::CFamilyFormattingStrategy;

const METHOD: &str = "void F()\n{\n\t// { unbalanced\n\tx(\"}\", '}');\n}";

#[test]
fn test_forward_search_skips_line_comment() {
    let doc = Document::from_text(METHOD);
    let strategy = CFamilyFormattingStrategy::csharp();
    let open = METHOD.find('{').unwrap();
    let close = METHOD.chars().count() - 1;
    assert_eq!(strategy.search_bracket_forward(&doc, open + 1, '{', '}'), Some(close));
}

#[test]
fn test_backward_search_skips_line_comment() {
    let doc = Document::from_text(METHOD);
    let strategy = CFamilyFormattingStrategy::csharp();
    let close = METHOD.chars().count() - 1;
    assert_eq!(strategy.search_bracket_backward(&doc, close - 1, '{', '}'), Some(9));
}

#[test]
fn test_search_from_inside_comment_or_string_fails() {
    let doc = Document::from_text("x = \"(a\" + b); // (c)");
    let strategy = CFamilyFormattingStrategy::csharp();
    // The `(` found by the quick scan is inside the comment, and so is the start.
    assert_eq!(strategy.search_bracket_backward(&doc, 19, '(', ')'), None);
    // Past the end.
    assert_eq!(strategy.search_bracket_backward(&doc, 21, '(', ')'), None);
}

#[test]
fn test_matched_pairs_are_symmetric() {
    let text = "class A\n{\n\tint[] a = { 1, 2 };\n\tvoid F(int b)\n\t{\n\t\tif (b > a[0]) { G(\"(\"); } // )\n\t}\n}";
    let doc = Document::from_text(text);
    let strategy = CFamilyFormattingStrategy::csharp();
    let chars: Vec<char> = text.chars().collect();
    let mut stacks: Vec<(char, char, Vec<usize>)> = vec![('(', ')', vec![]), ('[', ']', vec![]), ('{', '}', vec![])];
    let mut in_string = false;
    let mut in_comment = false;
    let mut pairs = Vec::new();
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '\n' {
            in_comment = false;
            continue;
        }
        if in_comment {
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if ch == '/' && chars.get(i + 1) == Some(&'/') {
            in_comment = true;
            continue;
        }
        for (open, close, stack) in stacks.iter_mut() {
            if ch == *open {
                stack.push(i);
            } else if ch == *close {
                let start = stack.pop().unwrap();
                pairs.push((*open, *close, start, i));
            }
        }
    }
    assert_eq!(pairs.len(), 9);
    for (open, close, start, end) in pairs {
        assert_eq!(strategy.search_bracket_forward(&doc, start + 1, open, close), Some(end));
        assert_eq!(strategy.search_bracket_backward(&doc, end - 1, open, close), Some(start));
    }
}

#[test]
fn test_goto_matching_bracket_through_document_strategy() {
    let mut doc = Document::from_text(METHOD);
    doc.set_formatting_strategy(Arc::new(CFamilyFormattingStrategy::csharp()));
    let csharp = LanguageConfig::csharp();
    let strategy = doc.formatting_strategy();
    let close = METHOD.chars().count() - 1;
    assert_eq!(goto_matching_bracket(&doc, strategy.as_ref(), &csharp.brackets, 10), Some(close));
    assert_eq!(goto_matching_bracket(&doc, strategy.as_ref(), &csharp.brackets, close + 1), Some(9));
    assert_eq!(doc.search_bracket_forward(10, '{', '}'), Some(close));
}
