mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use common::fixtures::{FaultyNode, deep_tree, document, hidden_style, list, login_form, wide_tree};
use dom_analyzer::dom::dom_model::DomNode;
use dom_analyzer::error::{AnalysisError, WarningKind};
use dom_analyzer::snapshot::format::format_tree;
use dom_analyzer::snapshot::{ElementSnapshotter, SnapshotOptions};

fn options() -> SnapshotOptions {
    SnapshotOptions::default()
}

// =========================================================================
// Bounds
// =========================================================================

#[test]
fn element_count_never_exceeds_max_elements() {
    let root = wide_tree(50);
    for max in [1, 5, 10, 49] {
        let opts = SnapshotOptions {
            max_elements: max,
            ..options()
        };
        let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
        assert!(
            snap.flat.len() <= max,
            "maxElements {max} produced {} records",
            snap.flat.len()
        );
        assert!(snap.stats.truncated_by_count, "truncation flag set for max {max}");
    }
}

#[test]
fn depth_bound_stops_descent() {
    let root = deep_tree(30);
    let opts = SnapshotOptions {
        max_depth: 5,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();

    assert!(snap.flat.iter().all(|r| r.position.depth <= 5), "no record deeper than maxDepth");
    assert_eq!(snap.flat.len(), 6, "root plus five nested levels");
    assert!(snap.stats.truncated_by_depth);
    assert!(!snap.stats.truncated_by_count);
}

#[test]
fn small_trees_are_not_truncated() {
    let snap = ElementSnapshotter::new()
        .snapshot(&document(vec![login_form()]), None, &options())
        .unwrap();
    assert!(!snap.stats.truncated_by_count);
    assert!(!snap.stats.truncated_by_depth);
    assert!(!snap.stats.timed_out);
    assert_eq!(snap.len(), snap.tree.node_count(), "flat list and tree agree");
}

#[test]
fn slow_page_times_out_with_a_partial_snapshot() {
    let root = FaultyNode::new("div")
        .slow(Duration::from_millis(30))
        .child(FaultyNode::new("p").text("a"))
        .child(FaultyNode::new("p").text("b"));
    let opts = SnapshotOptions {
        timeout: Duration::from_millis(5),
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();

    assert!(snap.stats.timed_out);
    assert_eq!(snap.flat.len(), 1, "only the root was captured in time");
    assert_eq!(snap.flat[0].tag_name, "div");
    let timeouts: Vec<_> = snap.warnings.iter().filter(|w| w.kind == WarningKind::Timeout).collect();
    assert_eq!(timeouts.len(), 1, "one timeout warning per pass");
}

#[test]
fn ancestor_text_reads_stay_within_the_element_budget() {
    let reads = Rc::new(Cell::new(0));
    let mut body = FaultyNode::new("body");
    for _ in 0..20_000 {
        body = body.child(FaultyNode::new("p").text("paragraph").counted(&reads));
    }
    let opts = SnapshotOptions {
        max_elements: 2,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&body, None, &opts).unwrap();

    assert_eq!(snap.flat.len(), 2);
    assert!(reads.get() <= 4, "read {} text nodes for two records", reads.get());
    assert!(snap.flat[0].text_content.as_deref().is_some_and(|t| t.len() <= opts.max_text_length + 3));
}

// =========================================================================
// Graceful degradation
// =========================================================================

#[test]
fn unreadable_element_is_omitted_and_others_survive() {
    let root = FaultyNode::new("div")
        .child(FaultyNode::new("p").attr("id", "first").text("a"))
        .child(
            FaultyNode::new("p")
                .broken()
                .text("b")
                .child(FaultyNode::new("em").text("inner")),
        )
        .child(FaultyNode::new("p").attr("id", "third").text("c"));

    let snap = ElementSnapshotter::new().snapshot(&root, None, &options()).unwrap();
    let paths: Vec<&str> = snap.flat.iter().map(|r| r.xpath.as_str()).collect();

    assert_eq!(
        paths,
        vec!["/div[1]", "/div[1]/p[1]", "/div[1]/p[2]/em[1]", "/div[1]/p[3]"],
        "only the failing element is missing"
    );
    assert_eq!(snap.stats.extraction_errors, 1);

    let em = &snap.flat[2];
    assert_eq!(em.parent, Some(0), "orphaned child attaches to nearest recorded ancestor");
}

#[test]
fn unusable_root_is_fatal() {
    let err = ElementSnapshotter::new()
        .snapshot(&DomNode::new(""), None, &options())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Fatal(_)), "empty tag: {err}");

    let err = ElementSnapshotter::new()
        .snapshot(&FaultyNode::new("div").broken(), None, &options())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Fatal(_)), "unreadable root: {err}");
}

// =========================================================================
// Filtering
// =========================================================================

#[test]
fn hidden_elements_need_include_hidden() {
    let root = document(vec![
        DomNode::new("div").attr("id", "shown").text("visible"),
        DomNode::new("div")
            .attr("id", "gone")
            .text("hidden")
            .with_style(hidden_style()),
        DomNode::new("input").attr("type", "hidden").attr("name", "csrf"),
    ]);

    let snap = ElementSnapshotter::new().snapshot(&root, None, &options()).unwrap();
    assert!(snap.flat.iter().any(|r| r.id() == Some("shown")));
    assert!(!snap.flat.iter().any(|r| r.id() == Some("gone")));
    assert!(!snap.flat.iter().any(|r| r.attr("name") == Some("csrf")));

    let opts = SnapshotOptions {
        include_hidden: true,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    let gone = snap.flat.iter().find(|r| r.id() == Some("gone")).unwrap();
    assert!(!gone.classification.is_visible);
}

#[test]
fn exclude_and_include_only_selectors_filter_per_element() {
    let root = document(vec![
        DomNode::new("div").attr("class", "ad banner").text("buy"),
        DomNode::new("div").attr("class", "content").text("read"),
        login_form(),
    ]);

    let opts = SnapshotOptions {
        exclude_selectors: vec![".ad".into()],
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    assert!(!snap.flat.iter().any(|r| r.classes().contains(&"ad")));
    assert!(snap.flat.iter().any(|r| r.classes().contains(&"content")));

    let opts = SnapshotOptions {
        include_only_selectors: vec!["form input".into()],
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    let tags: Vec<&str> = snap.flat.iter().skip(1).map(|r| r.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["input", "input"], "root is always kept, then only matches");
}

#[test]
fn invalid_selector_is_dropped_with_warning() {
    let root = document(vec![
        DomNode::new("div").attr("class", "ad").text("buy"),
        DomNode::new("p").text("keep"),
    ]);
    let opts = SnapshotOptions {
        exclude_selectors: vec!["div:hover".into(), ".ad".into()],
        ..options()
    };

    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    assert!(
        snap.warnings.iter().any(|w| w.kind == WarningKind::Configuration),
        "unsupported selector reported"
    );
    assert!(!snap.flat.iter().any(|r| r.classes().contains(&"ad")), "valid rule still applies");
    assert!(snap.flat.iter().any(|r| r.tag_name == "p"));
}

#[test]
fn only_form_elements_keeps_form_tags() {
    let root = document(vec![DomNode::new("h1").text("Welcome"), login_form()]);
    let opts = SnapshotOptions {
        only_form_elements: true,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    assert!(snap.flat.iter().skip(1).all(|r| r.classification.is_form_element));
    assert!(!snap.flat.iter().any(|r| r.tag_name == "h1"));
}

// =========================================================================
// Record contents
// =========================================================================

#[test]
fn records_carry_paths_selectors_and_state() {
    let root = document(vec![login_form()]);
    let snap = ElementSnapshotter::new().snapshot(&root, None, &options()).unwrap();

    let email = snap.flat.iter().find(|r| r.id() == Some("email")).unwrap();
    assert_eq!(email.xpath, "/html[1]/body[1]/form[1]/input[1]");
    assert_eq!(email.selector, "#email");
    assert!(email.classification.is_interactive);
    assert!(email.classification.is_form_element);
    assert!(email.state.is_some(), "inputs carry form state");
    assert_eq!(email.content_hash.len(), 16);

    let password = snap.flat.iter().find(|r| r.id() == Some("password")).unwrap();
    assert_eq!(password.xpath, "/html[1]/body[1]/form[1]/input[2]");

    let button = snap.flat.iter().find(|r| r.tag_name == "button").unwrap();
    assert_eq!(button.text_content.as_deref(), Some("Sign in"));
}

#[test]
fn text_is_truncated_to_max_text_length() {
    let root = DomNode::new("p").text("abcdefghijklmnopqrstuvwxyz");
    let opts = SnapshotOptions {
        max_text_length: 10,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    assert_eq!(snap.flat[0].text_content.as_deref(), Some("abcdefghij..."));
}

#[test]
fn repeated_elements_hit_the_extraction_cache() {
    let root = list(&["one", "two", "three", "four"]);
    let snap = ElementSnapshotter::new().snapshot(&root, None, &options()).unwrap();
    assert_eq!(snap.stats.cache_hits, 3, "first <li> fills the cache, the rest hit it");

    let opts = SnapshotOptions {
        extraction_cache: false,
        ..options()
    };
    let snap = ElementSnapshotter::new().snapshot(&root, None, &opts).unwrap();
    assert_eq!(snap.stats.cache_hits, 0);
}

#[test]
fn formatted_tree_indents_children() {
    let snap = ElementSnapshotter::new()
        .snapshot(&login_form(), None, &options())
        .unwrap();
    let text = format_tree(&snap.tree);
    let lines: Vec<&str> = text.lines().collect();

    assert!(lines[0].starts_with("form#login"), "root line: {}", lines[0]);
    assert!(
        lines.iter().any(|l| l.starts_with("  input#email [interactive form]")),
        "child line indented with flags:\n{text}"
    );
}
