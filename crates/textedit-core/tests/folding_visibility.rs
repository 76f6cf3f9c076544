use std::sync::{Arc, Mutex};
use textedit_core::{Document, DocumentError, DocumentEvent, Fold, FoldingStrategy, TextLocation};

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
}

fn fold(doc: &Document, start: (usize, usize), end: (usize, usize), folded: bool) -> Fold {
    Fold::from_locations(
        doc.buffer(),
        TextLocation::new(start.0, start.1),
        TextLocation::new(end.0, end.1),
        "...",
        folded,
    )
}

#[test]
fn test_scenario_folding_lines_five_to_ten() {
    let mut doc = Document::from_text(&numbered_lines(20));
    let unfolded = doc.folding().get_visible_line(11);
    doc.update_folds(vec![fold(&doc, (5, 6), (10, 6), false)]).unwrap();
    assert_eq!(doc.folding().get_visible_line(11), unfolded);

    doc.set_folded(0, true);
    assert_eq!(doc.folding().get_visible_line(11), unfolded - 5);
    assert!(doc.folding().is_line_visible(5));
    assert!(!doc.folding().is_line_visible(7));
}

#[test]
fn test_toggling_is_monotonic_and_reversible() {
    let mut doc = Document::from_text(&numbered_lines(30));
    let total = doc.line_count();
    let folds = vec![
        fold(&doc, (2, 0), (12, 0), false),
        fold(&doc, (4, 0), (6, 0), false),
        fold(&doc, (15, 0), (20, 0), false),
    ];
    doc.update_folds(folds).unwrap();
    let base = doc.folding().get_visible_line(total);
    assert_eq!(base, total);

    for index in 0..doc.folding().len() {
        let before = doc.folding().get_visible_line(total);
        assert!(doc.toggle_fold(index));
        let after = doc.folding().get_visible_line(total);
        assert!(after <= before);
    }
    for index in (0..doc.folding().len()).rev() {
        doc.toggle_fold(index);
    }
    assert_eq!(doc.folding().get_visible_line(total), base);
}

#[test]
fn test_first_logical_line_is_consistent() {
    let mut doc = Document::from_text(&numbered_lines(40));
    let folds = vec![
        fold(&doc, (3, 0), (8, 0), true),
        fold(&doc, (5, 0), (6, 0), true),
        fold(&doc, (20, 0), (25, 2), true),
    ];
    doc.update_folds(folds).unwrap();
    let folding = doc.folding();
    for visible in 0..folding.total_visible_lines(doc.line_count()) {
        let logical = folding.get_first_logical_line(visible);
        assert!(folding.get_visible_line(logical) <= visible);
        assert!(folding.is_line_visible(logical));
    }
}

#[test]
fn test_partial_overlap_is_rejected_and_keeps_old_folds() {
    let mut doc = Document::from_text(&numbered_lines(10));
    doc.update_folds(vec![fold(&doc, (1, 0), (3, 0), true)]).unwrap();
    let result = doc.update_folds(vec![
        fold(&doc, (1, 0), (5, 0), false),
        fold(&doc, (3, 0), (7, 0), false),
    ]);
    assert!(matches!(result, Err(DocumentError::MalformedFoldSet { .. })));
    assert_eq!(doc.folding().len(), 1);
    assert!(doc.folding().folds()[0].is_folded());
}

struct EveryOtherLine;

impl FoldingStrategy for EveryOtherLine {
    fn generate_folds(&self, document: &Document, _file_name: Option<&str>) -> Vec<Fold> {
        (0..document.line_count().saturating_sub(1))
            .step_by(2)
            .map(|line| {
                Fold::from_locations(
                    document.buffer(),
                    TextLocation::new(line, 1),
                    TextLocation::new(line + 1, 1),
                    "{...}",
                    false,
                )
            })
            .collect()
    }
}

#[test]
fn test_strategy_rebuild_preserves_folded_state() {
    let mut doc = Document::from_text(&numbered_lines(6));
    let events = Arc::new(Mutex::new(0));
    let sink = events.clone();
    doc.subscribe(move |event| {
        if matches!(event, DocumentEvent::FoldingChanged) {
            *sink.lock().unwrap() += 1;
        }
    });
    doc.set_folding_strategy(Some(Arc::new(EveryOtherLine)));
    doc.update_folds_from_strategy(None).unwrap();
    assert_eq!(doc.folding().len(), 3);
    doc.set_folded(1, true);

    doc.insert(doc.text_length(), "!").unwrap();
    doc.update_folds_from_strategy(None).unwrap();
    let states: Vec<_> = doc.folding().folds().iter().map(Fold::is_folded).collect();
    assert_eq!(states, vec![false, true, false]);
    assert!(*events.lock().unwrap() >= 2);
}

#[test]
fn test_folding_disabled_skips_strategy() {
    let mut doc = Document::from_text(&numbered_lines(4));
    let mut properties = doc.properties().clone();
    properties.enable_folding = false;
    doc.set_properties(properties);
    doc.set_folding_strategy(Some(Arc::new(EveryOtherLine)));
    doc.update_folds_from_strategy(None).unwrap();
    assert!(doc.folding().is_empty());
}

#[test]
fn test_removing_a_fold_body_drops_the_fold() {
    let mut doc = Document::from_text("ab{cd}ef");
    doc.update_folds(vec![Fold::new(doc.buffer(), 2, 4, "{...}", true).unwrap()])
        .unwrap();
    doc.insert(0, "zz").unwrap();
    assert_eq!(doc.folding().folds()[0].offset(), 4);
    doc.remove(3, 6).unwrap();
    assert!(doc.folding().is_empty());
}
