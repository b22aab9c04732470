mod common;

use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::Arc;

use common::fixtures::{document, list, login_form, page};
use dom_analyzer::analysis::{AnalysisConfig, AnalysisOrchestrator};
use dom_analyzer::collab::{
    Action, AnalysisRequest, AnalysisResponse, FileResultStore, MemoryDelivery, MemoryResultStore,
    RequestHandler, ResultStore, StoreError,
};
use serde_json::{Value, json};

fn handler() -> RequestHandler {
    RequestHandler::new(Box::new(MemoryResultStore::new()))
}

fn analyze(items: &[&str]) -> AnalysisRequest {
    AnalysisRequest::new(Action::Analyze).with_page(page(document(vec![list(items)])))
}

fn in_session(items: &[&str], session: &str) -> AnalysisRequest {
    let mut request = analyze(items);
    request.session = Some(session.into());
    request
}

// =========================================================================
// Result store
// =========================================================================

#[test]
fn file_store_round_trips_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileResultStore::new(dir.path());
    assert!(store.load("run-1").unwrap().is_none(), "nothing stored yet");

    let result = AnalysisOrchestrator::default()
        .analyze_page(&page(document(vec![login_form()])), &AnalysisConfig::default())
        .unwrap();
    store.save("run-1", &result).unwrap();
    assert!(dir.path().join("run-1.json").exists());

    let loaded = store.load("run-1").unwrap().expect("stored result");
    assert_eq!(loaded.url, result.url);
    assert_eq!(loaded.elements, result.elements);
    assert_eq!(loaded.detected_patterns.len(), result.detected_patterns.len());

    store.clear("run-1").unwrap();
    assert!(store.load("run-1").unwrap().is_none());
    store.clear("run-1").unwrap();
}

#[test]
fn file_store_rejects_path_like_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileResultStore::new(dir.path());
    for session in ["../escape", "a/b", ""] {
        assert!(
            matches!(store.load(session), Err(StoreError::InvalidSession(_))),
            "session {session:?} accepted"
        );
    }
}

#[test]
fn file_store_reports_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    let store = FileResultStore::new(dir.path());
    assert!(matches!(store.load("broken"), Err(StoreError::Json { .. })));
}

// =========================================================================
// Request handling
// =========================================================================

#[test]
fn request_cycle_tracks_a_session() {
    let sink = Arc::new(MemoryDelivery::new());
    let mut handler = handler().with_delivery(Box::new(Arc::clone(&sink)));

    let empty = handler.handle(AnalysisRequest::new(Action::GetLastResult));
    assert!(empty.success);
    assert_eq!(empty.data, Some(Value::Null));

    let first = handler.handle(analyze(&["a", "b"]));
    assert!(first.success, "error: {:?}", first.error);
    let data = first.data.unwrap();
    assert_eq!(data["domDiff"]["isBaseline"], true);
    assert!(data["elements"].as_array().is_some_and(|e| e.len() == 5));

    let second = handler.handle(analyze(&["a", "b", "c"]));
    assert!(second.success);

    let summary = handler.handle(AnalysisRequest::new(Action::GetDiffSummary));
    let summary = summary.data.unwrap();
    assert_eq!(summary["isBaseline"], false);
    assert_eq!(summary["summary"]["added"], 1);

    let last = handler.handle(AnalysisRequest::new(Action::GetLastResult)).data.unwrap();
    assert_eq!(last["elements"].as_array().map(Vec::len), Some(6));

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 2, "one telemetry record per analysis");
    assert!(delivered[0].is_baseline);
    assert_eq!(delivered[1].summary.added, 1);

    let reset = handler.handle(AnalysisRequest::new(Action::ResetBaseline));
    assert_eq!(reset.data, Some(json!({ "reset": true })));
    let after_reset = handler.handle(analyze(&["a"])).data.unwrap();
    assert_eq!(after_reset["domDiff"]["isBaseline"], true);
}

#[test]
fn sessions_are_kept_apart() {
    let mut handler = handler();
    let mut request = analyze(&["a"]);
    request.session = Some("other".into());
    assert!(handler.handle(request).success);

    let default = handler.handle(AnalysisRequest::new(Action::GetLastResult));
    assert_eq!(default.data, Some(Value::Null));

    let mut lookup = AnalysisRequest::new(Action::GetLastResult);
    lookup.session = Some("other".into());
    assert!(handler.handle(lookup).data.is_some_and(|d| !d.is_null()));
}

#[test]
fn each_session_starts_from_its_own_baseline() {
    let mut handler = handler();

    let alpha = handler.handle(in_session(&["a", "b", "c"], "alpha")).data.unwrap();
    assert_eq!(alpha["domDiff"]["isBaseline"], true);

    let beta = handler.handle(in_session(&["x"], "beta")).data.unwrap();
    assert_eq!(beta["domDiff"]["isBaseline"], true, "beta is not diffed against alpha");

    let alpha = handler.handle(in_session(&["a", "b", "c", "d"], "alpha")).data.unwrap();
    assert_eq!(alpha["domDiff"]["isBaseline"], false);
    assert_eq!(alpha["domDiff"]["summary"]["added"], 1, "alpha compares with its own page");

    let mut reset = AnalysisRequest::new(Action::ResetBaseline);
    reset.session = Some("beta".into());
    assert!(handler.handle(reset).success);

    let alpha = handler.handle(in_session(&["a", "b", "c", "d"], "alpha")).data.unwrap();
    assert_eq!(alpha["domDiff"]["isBaseline"], false, "reset only touches beta");
    let beta = handler.handle(in_session(&["x"], "beta")).data.unwrap();
    assert_eq!(beta["domDiff"]["isBaseline"], true);
}

#[test]
fn factory_builds_one_orchestrator_per_session() {
    let built = Rc::new(Cell::new(0));
    let counter = Rc::clone(&built);
    let mut handler = handler().with_factory(move || {
        counter.set(counter.get() + 1);
        AnalysisOrchestrator::default()
    });

    for session in ["alpha", "beta", "alpha", "alpha"] {
        assert!(handler.handle(in_session(&["a"], session)).success);
    }
    assert_eq!(built.get(), 2);
}

#[test]
fn options_override_the_default_config() {
    let mut handler = handler();
    let response = handler.handle(analyze(&["a"]).with_options(json!({ "dependencyTracking": false })));
    let data = response.data.unwrap();
    assert!(data["dependencyGraph"].is_null());
    assert_eq!(data["config"]["dependencyTracking"], false);

    let response = handler.handle(analyze(&["a"]).with_options(json!(["not", "an", "object"])));
    assert!(!response.success);
}

#[test]
fn bad_requests_get_error_responses() {
    let mut handler = handler();

    let response = handler.handle_line("this is not json");
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("invalid request"));

    let response = handler.handle_line(r#"{"action":"explode"}"#);
    assert!(!response.success);

    let response = handler.handle(AnalysisRequest::new(Action::Analyze));
    assert_eq!(
        response,
        AnalysisResponse::err("analyze requires a page"),
        "analyze without a page"
    );
}

#[test]
fn serve_answers_one_line_per_request() {
    let request = serde_json::to_string(&analyze(&["a", "b"])).unwrap();
    let input = format!("{request}\n\n{}\n", r#"{"action":"getDiffSummary"}"#);
    let mut output = Vec::new();

    handler().serve(Cursor::new(input), &mut output).unwrap();

    let lines: Vec<AnalysisResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2, "blank lines are skipped");
    assert!(lines.iter().all(|r| r.success));
    assert_eq!(lines[1].data.as_ref().unwrap()["isBaseline"], true);
}

#[test]
fn memory_store_keeps_latest_result() {
    let mut store = MemoryResultStore::new();
    let mut orchestrator = AnalysisOrchestrator::default();
    let config = AnalysisConfig::default();

    let first = orchestrator.analyze_page(&page(list(&["a"])), &config).unwrap();
    let second = orchestrator.analyze_page(&page(list(&["a", "b"])), &config).unwrap();
    store.save("s", &first).unwrap();
    store.save("s", &second).unwrap();

    assert_eq!(store.load("s").unwrap().map(|r| r.elements.len()), Some(3));
    store.clear("s").unwrap();
    assert!(store.load("s").unwrap().is_none());
}
