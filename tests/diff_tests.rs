mod common;

use common::fixtures::{document, list, value_state};
use dom_analyzer::diff::diff_model::ModificationKind;
use dom_analyzer::diff::{ChangeType, DiffEngine, DiffOptions, Significance, compare};
use dom_analyzer::dom::dom_model::DomNode;
use dom_analyzer::snapshot::{ElementSnapshotter, Snapshot, SnapshotOptions};

fn snap(root: &DomNode) -> Snapshot {
    ElementSnapshotter::new()
        .snapshot(root, None, &SnapshotOptions::default())
        .unwrap()
}

// =========================================================================
// Baseline handling
// =========================================================================

#[test]
fn first_diff_is_a_zero_change_baseline() {
    let mut engine = DiffEngine::new();
    let result = engine.diff(&snap(&document(vec![list(&["a", "b"])])), &DiffOptions::default());

    assert!(result.is_baseline);
    assert_eq!(result.summary.total, 0);
    assert_eq!(result.summary.added, 0);
    assert_eq!(result.summary.removed, 0);
    assert_eq!(result.change_rate, 0.0);
    assert!(engine.baseline().is_some(), "baseline retained for the next pass");
}

#[test]
fn identical_snapshots_have_no_changes() {
    let root = document(vec![list(&["a", "b"])]);
    let mut engine = DiffEngine::new();
    engine.diff(&snap(&root), &DiffOptions::default());
    let result = engine.diff(&snap(&root), &DiffOptions::default());

    assert!(!result.is_baseline);
    assert_eq!(result.summary.total, 0, "changes: {:?}", result.changes);
}

#[test]
fn appended_leaf_is_one_addition_and_reverse_is_one_removal() {
    let before = snap(&document(vec![list(&["a", "b"])]));
    let after = snap(&document(vec![list(&["a", "b", "c"])]));
    let options = DiffOptions::default();

    let mut engine = DiffEngine::new();
    engine.diff(&before, &options);
    let forward = engine.diff(&after, &options);
    assert_eq!(forward.summary.added, 1);
    assert_eq!(forward.summary.removed, 0);
    assert_eq!(
        forward.changes.added[0].path,
        "/html[1]/body[1]/ul[1]/li[3]"
    );

    engine.reset();
    assert!(engine.baseline().is_none());
    assert!(engine.diff(&after, &options).is_baseline, "reset starts a new baseline");
    let backward = engine.diff(&before, &options);
    assert_eq!(backward.summary.removed, 1);
    assert_eq!(backward.summary.added, 0);
    assert_eq!(backward.changes.removed[0].element.text.as_deref(), Some("c"));
}

#[test]
fn compare_leaves_no_state_behind() {
    let before = snap(&document(vec![list(&["a"])]));
    let after = snap(&document(vec![list(&["a", "b"])]));
    let first = compare(&before, &after, &DiffOptions::default());
    let second = compare(&before, &after, &DiffOptions::default());
    assert_eq!(first.summary, second.summary);
    assert!(first.change_rate > 0.0 && first.change_rate <= 1.0);
}

// =========================================================================
// Significance
// =========================================================================

fn field(class: &str, value: &str) -> DomNode {
    document(vec![
        DomNode::new("input")
            .attr("id", "email")
            .attr("type", "email")
            .attr("class", class)
            .with_state(value_state(value)),
    ])
}

#[test]
fn value_change_on_input_is_high_even_with_class_churn() {
    let result = compare(
        &snap(&field("plain", "old@example.com")),
        &snap(&field("focused", "new@example.com")),
        &DiffOptions::default(),
    );

    let change = result
        .changes
        .modified
        .iter()
        .find(|c| c.element.tag_name == "input")
        .expect("input modified");
    assert_eq!(change.significance, Significance::High);
    assert!(
        change
            .modifications
            .iter()
            .any(|m| m.kind == ModificationKind::State && m.key == "value")
    );
    assert!(result.significant_changes.iter().any(|c| c.path == change.path));
    assert!(result.summary.significant >= 1);
}

#[test]
fn class_change_is_medium_and_text_change_is_low() {
    let before = snap(&document(vec![
        DomNode::new("div").attr("class", "card"),
        DomNode::new("p").text("Hello"),
    ]));
    let after = snap(&document(vec![
        DomNode::new("div").attr("class", "card active"),
        DomNode::new("p").text("Goodbye"),
    ]));
    let result = compare(&before, &after, &DiffOptions::default());

    let div = result.changes.modified.iter().find(|c| c.element.tag_name == "div").unwrap();
    assert_eq!(div.significance, Significance::Medium);

    let p = result.changes.modified.iter().find(|c| c.element.tag_name == "p").unwrap();
    assert_eq!(p.significance, Significance::Low);
    assert_eq!(p.modifications[0].kind, ModificationKind::Text);
}

#[test]
fn added_button_is_high() {
    let before = snap(&document(vec![DomNode::new("p").text("x")]));
    let after = snap(&document(vec![
        DomNode::new("p").text("x"),
        DomNode::new("button").text("Go"),
    ]));
    let result = compare(&before, &after, &DiffOptions::default());
    let added = &result.changes.added[0];
    assert_eq!(added.change_type, ChangeType::Added);
    assert_eq!(added.significance, Significance::High);
}

// =========================================================================
// Matching
// =========================================================================

#[test]
fn element_with_stable_id_that_changed_position_is_moved() {
    let before = snap(&document(vec![
        DomNode::new("div").child(DomNode::new("button").attr("id", "save").text("Save")),
    ]));
    let after = snap(&document(vec![
        DomNode::new("div").attr("class", "intro").text("Welcome"),
        DomNode::new("div").child(DomNode::new("button").attr("id", "save").text("Save")),
    ]));
    let result = compare(&before, &after, &DiffOptions::default());

    assert_eq!(result.summary.moved, 1, "changes: {:?}", result.changes);
    let moved = &result.changes.moved[0];
    assert_eq!(moved.change_type, ChangeType::Moved);
    assert_eq!(moved.path, "/html[1]/body[1]/div[2]/button[1]");
    assert_eq!(
        moved.previous_path.as_deref(),
        Some("/html[1]/body[1]/div[1]/button[1]")
    );
    assert!(
        !result.changes.added.iter().any(|c| c.element.tag_name == "button"),
        "a moved element is not also added"
    );
}

#[test]
fn same_slot_with_different_stable_ids_is_replacement() {
    let before = snap(&document(vec![DomNode::new("section").attr("id", "news")]));
    let after = snap(&document(vec![DomNode::new("section").attr("id", "sports")]));
    let result = compare(&before, &after, &DiffOptions::default());

    assert_eq!(result.summary.added, 1);
    assert_eq!(result.summary.removed, 1);
    assert_eq!(result.summary.modified, 0);
}

#[test]
fn ignored_attributes_do_not_count() {
    let before = snap(&document(vec![
        DomNode::new("div")
            .attr("data-timestamp", "1")
            .attr("style", "color: red"),
    ]));
    let after = snap(&document(vec![
        DomNode::new("div")
            .attr("data-timestamp", "2")
            .attr("style", "color: blue"),
    ]));

    let result = compare(&before, &after, &DiffOptions::default());
    assert_eq!(result.summary.total, 0);

    let strict = DiffOptions {
        ignore_attributes: vec![],
        ..DiffOptions::default()
    };
    let result = compare(&before, &after, &strict);
    assert_eq!(result.summary.modified, 1);
    assert_eq!(result.changes.modified[0].modifications.len(), 2);
}

#[test]
fn weak_candidates_below_threshold_are_remove_and_add() {
    let input = |id: &str, class: &str| {
        DomNode::new("input")
            .attr("id", id)
            .attr("name", "q")
            .attr("class", class)
    };
    let before = snap(&document(vec![
        DomNode::new("div")
            .child(input("field-1", "narrow"))
            .child(input("field-2", "wide")),
    ]));
    let after = snap(&document(vec![
        DomNode::new("div").child(DomNode::new("p").child(input("field-9", "compact"))),
    ]));

    let result = compare(&before, &after, &DiffOptions::default());
    let removed: Vec<&str> = result.changes.removed.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(
        removed,
        vec!["/html[1]/body[1]/div[1]/input[1]", "/html[1]/body[1]/div[1]/input[2]"]
    );
    assert!(
        result
            .changes
            .added
            .iter()
            .any(|c| c.path == "/html[1]/body[1]/div[1]/p[1]/input[1]"),
        "input added instead of matched: {:?}",
        result.changes
    );
    assert!(result.changes.modified.is_empty());
    assert!(result.changes.moved.is_empty());

    // One candidate under the same name key is accepted without scoring.
    let single = snap(&document(vec![DomNode::new("div").child(input("field-1", "narrow"))]));
    let result = compare(&single, &after, &DiffOptions::default());
    assert_eq!(result.summary.moved, 1);
    assert_eq!(
        result.changes.moved[0].previous_path.as_deref(),
        Some("/html[1]/body[1]/div[1]/input[1]")
    );
}
