use pretty_assertions::assert_eq;
use std::sync::Arc;
use textedit_core::{Document, DocumentEvent};
use textedit_core_cfamily::{CFamilyFoldingStrategy, IndentationSettings, reformat_text};

const MESSY: &str = "namespace N\r\n{\r\n/// <summary>\r\n/// A.\r\n/// </summary>\r\nclass A\r\n{\r\nint[] values = {\r\n1,\r\n2\r\n};\r\nvoid F(int a,\r\nint b)\r\n{\r\nswitch (a)\r\n{\r\ncase 1:\r\nG();\r\nbreak;\r\n}\r\nfor (;;)\r\nH();\r\nelse\r\n/* note\r\n* more */\r\nreturn;\r\n}\r\n}\r\n}\r\n";

const TIDY: &str = "namespace N\r\n{\r\n\t/// <summary>\r\n\t/// A.\r\n\t/// </summary>\r\n\tclass A\r\n\t{\r\n\t\tint[] values = {\r\n\t\t\t1,\r\n\t\t\t2\r\n\t\t};\r\n\t\tvoid F(int a,\r\n\t\t       int b)\r\n\t\t{\r\n\t\t\tswitch (a)\r\n\t\t\t{\r\n\t\t\t\tcase 1:\r\n\t\t\t\t\tG();\r\n\t\t\t\t\tbreak;\r\n\t\t\t}\r\n\t\t\tfor (;;)\r\n\t\t\t\tH();\r\n\t\t\telse\r\n\t\t\t\t/* note\r\n\t\t\t\t * more */\r\n\t\t\t\treturn;\r\n\t\t}\r\n\t}\r\n}\r\n";

#[test]
fn test_reformat_whole_file() {
    let settings = IndentationSettings::default();
    assert_eq!(reformat_text(MESSY, &settings, Some('@')).unwrap(), TIDY);
}

#[test]
fn test_reformat_is_idempotent() {
    let settings = IndentationSettings::default();
    let once = reformat_text(MESSY, &settings, Some('@')).unwrap();
    assert_eq!(reformat_text(&once, &settings, Some('@')).unwrap(), once);
}

#[test]
fn test_document_folds_from_strategy() {
    let mut doc = Document::from_text(TIDY);
    doc.set_folding_strategy(Some(Arc::new(CFamilyFoldingStrategy::csharp().unwrap())));
    doc.update_folds_from_strategy(Some("a.cs")).unwrap();

    let spans: Vec<(usize, usize)> = doc
        .folding()
        .folds()
        .iter()
        .map(|fold| (fold.start_line(), fold.end_line()))
        .collect();
    assert_eq!(spans, vec![(0, 28), (5, 27), (12, 26)]);

    let total = doc.line_count();
    let before = doc.folding().get_visible_line(total);
    doc.set_folded(2, true);
    assert_eq!(doc.folding().get_visible_line(total), before - 14);
}

#[test]
fn test_region_state_survives_rebuild() {
    let text = "#region Setup\nint a;\n#endregion\nvoid F()\n{\n}\n";
    let mut doc = Document::from_text(text);
    doc.set_folding_strategy(Some(Arc::new(CFamilyFoldingStrategy::csharp().unwrap())));
    let changes = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    doc.subscribe(move |event| {
        if matches!(event, DocumentEvent::FoldingChanged) {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    });
    doc.update_folds_from_strategy(None).unwrap();
    let folded: Vec<bool> = doc.folding().folds().iter().map(|fold| fold.is_folded()).collect();
    assert_eq!(folded, vec![true, false]);

    doc.set_folded(0, false);
    doc.insert(0, "// header\n").unwrap();
    doc.update_folds_from_strategy(None).unwrap();
    let folds = doc.folding().folds();
    assert_eq!(folds.len(), 2);
    assert_eq!((folds[0].start_line(), folds[0].fold_text()), (1, "Setup"));
    assert!(!folds[0].is_folded());
    assert!(changes.load(std::sync::atomic::Ordering::SeqCst) >= 2);
}
