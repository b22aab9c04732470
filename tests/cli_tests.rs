mod common;

use std::path::Path;

use clap::Parser;
use common::fixtures::{document, list, login_form, page};
use dom_analyzer::analysis::AnalysisConfig;
use dom_analyzer::cli::commands::{
    cmd_analyze, cmd_diff, cmd_patterns, diff_pages, format_diff_summary, load_page, recognize_page,
};
use dom_analyzer::cli::config::{AppConfig, Cli, Commands, load_config, log_filter};
use dom_analyzer::dom::dom_model::DomNode;
use dom_analyzer::trace::logger::TraceLogger;

fn write_page(dir: &Path, name: &str, root: DomNode) -> String {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&page(root)).unwrap()).unwrap();
    path.display().to_string()
}

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_analyze_minimal() {
    let cli = Cli::parse_from(["dom-analyzer", "analyze", "--input", "page.json"]);
    match cli.command {
        Commands::Analyze {
            input,
            baseline,
            output,
            session,
            deliver,
        } => {
            assert_eq!(input, "page.json");
            assert!(baseline.is_none());
            assert!(output.is_none());
            assert!(session.is_none());
            assert!(!deliver);
        }
        _ => panic!("Expected Analyze command"),
    }
}

#[test]
fn cli_parse_analyze_all_args() {
    let cli = Cli::parse_from([
        "dom-analyzer",
        "analyze",
        "--input",
        "after.json",
        "--baseline",
        "before.json",
        "-o",
        "result.json",
        "--session",
        "checkout",
        "--deliver",
    ]);
    match cli.command {
        Commands::Analyze {
            input,
            baseline,
            output,
            session,
            deliver,
        } => {
            assert_eq!(input, "after.json");
            assert_eq!(baseline.as_deref(), Some("before.json"));
            assert_eq!(output.as_deref(), Some("result.json"));
            assert_eq!(session.as_deref(), Some("checkout"));
            assert!(deliver);
        }
        _ => panic!("Expected Analyze command"),
    }
}

#[test]
fn cli_parse_diff_and_patterns() {
    let cli = Cli::parse_from(["dom-analyzer", "diff", "--before", "a.json", "--after", "b.json"]);
    assert!(matches!(cli.command, Commands::Diff { ref before, ref after } if before == "a.json" && after == "b.json"));

    let cli = Cli::parse_from(["dom-analyzer", "patterns", "--input", "p.json", "--library", "lib.yaml"]);
    match cli.command {
        Commands::Patterns { input, library } => {
            assert_eq!(input, "p.json");
            assert_eq!(library.as_deref(), Some("lib.yaml"));
        }
        _ => panic!("Expected Patterns command"),
    }
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from(["dom-analyzer", "-vv", "serve", "--trace", "trace.jsonl"]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.trace.as_deref(), Some("trace.jsonl"));
    assert!(matches!(cli.command, Commands::Serve { session: None }));

    assert_eq!(log_filter(0), "warn");
    assert_eq!(log_filter(1), "info");
    assert_eq!(log_filter(9), "trace");
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.analysis, AnalysisConfig::default());
    assert_eq!(config.store.directory, ".dom-analyzer");
    assert!(config.delivery.endpoint.is_none());
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
analysis:
  maxElements: 50
  graph:
    classes: true
delivery:
  endpoint: "http://localhost:9000/telemetry"
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.analysis.max_elements, 50);
    assert!(config.analysis.graph.classes);
    assert!(config.analysis.graph.forms, "unset flags keep defaults");
    assert_eq!(config.analysis.max_depth, 15);
    assert_eq!(
        config.delivery.endpoint.as_deref(),
        Some("http://localhost:9000/telemetry")
    );
    assert_eq!(config.store.directory, ".dom-analyzer");
}

#[test]
fn config_malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "analysis: [this is: not a map").unwrap();

    let config = load_config(Some(path.to_str().unwrap()));
    assert_eq!(config.analysis, AnalysisConfig::default());
}

#[test]
fn config_yaml_roundtrip() {
    let config = AppConfig::default();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed.analysis, config.analysis);
    assert_eq!(parsed.store.directory, config.store.directory);
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn load_page_reads_json_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_page(dir.path(), "page.json", document(vec![login_form()]));
    let loaded = load_page(&path).unwrap();
    assert_eq!(loaded.url.as_deref(), Some("https://example.test/"));
    assert_eq!(loaded.root.tag, "html");

    assert!(load_page(&dir.path().join("missing.json").display().to_string()).is_err());
}

#[test]
fn diff_command_compares_two_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_page(dir.path(), "before.json", document(vec![list(&["a", "b"])]));
    let after = write_page(dir.path(), "after.json", document(vec![list(&["a", "b", "c"])]));

    let diff = cmd_diff(&before, &after, &AnalysisConfig::default()).unwrap();
    assert_eq!(diff.summary.added, 1);
    assert!(format_diff_summary(&diff).starts_with("diff: +1 -0"));
}

#[test]
fn diff_reports_config_repairs_and_snapshot_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_page(dir.path(), "before.json", document(vec![list(&["a"])]));
    let after = write_page(dir.path(), "after.json", document(vec![list(&["a", "b"])]));
    let config = AnalysisConfig {
        max_elements: 0,
        exclude_selectors: vec!["li:hover".into()],
        ..AnalysisConfig::default()
    };

    let (diff, warnings) = diff_pages(&before, &after, &config).unwrap();
    assert_eq!(diff.summary.added, 1, "repaired config still diffs");
    let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(messages.len(), 3, "one repair plus one selector warning per snapshot: {messages:?}");
    assert!(messages[0].contains("maxElements"));
    assert!(messages[1..].iter().all(|m| m.starts_with("excludeSelectors")));
}

#[test]
fn patterns_report_config_repairs_with_recognition_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_page(dir.path(), "page.json", document(vec![login_form()]));
    let library = dir.path().join("library.yaml");
    std::fs::write(
        &library,
        "patterns:\n  - name: forms\n    type: form\n    selectors: [\"form\", \"a:hover\"]\n",
    )
    .unwrap();
    let config = AnalysisConfig {
        similarity_threshold: 2.0,
        ..AnalysisConfig::default()
    };

    let recognition = recognize_page(&input, library.to_str(), &config).unwrap();
    assert_eq!(recognition.warnings.len(), 2, "{:?}", recognition.warnings);
    assert!(recognition.warnings[0].message.contains("similarityThreshold"));
    assert!(recognition.warnings[1].message.contains("pattern 'forms'"));
}

#[test]
fn patterns_command_uses_library_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_page(dir.path(), "page.json", document(vec![login_form()]));
    let library = dir.path().join("library.yaml");
    std::fs::write(
        &library,
        "patterns:\n  - name: any_form\n    type: form\n    selectors: [\"form\"]\n",
    )
    .unwrap();

    let matches = cmd_patterns(&input, library.to_str(), &AnalysisConfig::default()).unwrap();
    assert!(matches.iter().any(|m| m.name == "any_form"));
    assert!(!matches.iter().any(|m| m.name == "login_form"), "library replaces catalog");
}

#[test]
fn analyze_command_stores_and_writes_result() {
    let dir = tempfile::tempdir().unwrap();
    let before = write_page(dir.path(), "before.json", document(vec![list(&["a"])]));
    let after = write_page(dir.path(), "after.json", document(vec![list(&["a", "b"])]));
    let output = dir.path().join("result.json");
    let trace = dir.path().join("trace.jsonl");

    let mut app = AppConfig::default();
    app.store.directory = dir.path().join("store").display().to_string();

    let result = cmd_analyze(
        &after,
        Some(&before),
        output.to_str(),
        Some("cli"),
        false,
        &app,
        &TraceLogger::new(&trace),
    )
    .unwrap();

    assert_eq!(result.dom_diff.as_ref().map(|d| d.summary.added), Some(1));
    assert!(output.exists());
    assert!(dir.path().join("store").join("cli.json").exists());

    let trace_lines = std::fs::read_to_string(&trace).unwrap();
    assert_eq!(trace_lines.lines().count(), 1);
}
