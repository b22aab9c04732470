use std::io;

use tracing::{info, warn};

use crate::analysis::config::AnalysisConfig;
use crate::analysis::orchestrator::AnalysisOrchestrator;
use crate::analysis::result::AnalysisResult;
use crate::cli::config::AppConfig;
use crate::collab::delivery::{DeliverySink, DiffTelemetry, HttpDelivery};
use crate::collab::store::{FileResultStore, ResultStore};
use crate::collab::transport::{DEFAULT_SESSION, RequestHandler};
use crate::diff::diff_model::DiffResult;
use crate::diff::engine::compare;
use crate::dom::dom_model::DomPage;
use crate::dom::index::DocumentIndex;
use crate::error::Warning;
use crate::pattern::pattern_model::{PatternLibrary, PatternMatch};
use crate::pattern::recognizer::{PatternRecognizer, Recognition};
use crate::snapshot::snapshotter::ElementSnapshotter;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_page(path: &str) -> CmdResult<DomPage> {
    let content = std::fs::read_to_string(path)?;
    Ok(DomPage::from_json(&content)?)
}

// ============================================================================
// analyze subcommand
// ============================================================================

pub fn cmd_analyze(
    input: &str,
    baseline: Option<&str>,
    output: Option<&str>,
    session: Option<&str>,
    deliver: bool,
    app: &AppConfig,
    tracer: &TraceLogger,
) -> CmdResult<AnalysisResult> {
    let page = load_page(input)?;
    let mut orchestrator = AnalysisOrchestrator::default();

    if let Some(path) = baseline {
        let previous = load_page(path)?;
        info!(baseline = path, "analyzing baseline");
        orchestrator.analyze_page(&previous, &app.analysis)?;
    }

    info!(input, "analyzing page");
    let result = orchestrator.analyze_page(&page, &app.analysis)?;
    if tracer.is_enabled() {
        tracer.log(&TraceEvent::now(1).with_result(&result));
    }

    let session = session.unwrap_or(DEFAULT_SESSION);
    let mut store = FileResultStore::new(&app.store.directory);
    if let Err(e) = store.save(session, &result) {
        warn!(session, error = %e, "could not store result");
    }

    if deliver {
        match (&app.delivery.endpoint, DiffTelemetry::from_result(&result)) {
            (Some(endpoint), Some(telemetry)) => HttpDelivery::new(endpoint)?.deliver(&telemetry)?,
            (None, _) => warn!("--deliver given but no delivery endpoint is configured"),
            (_, None) => warn!("--deliver given but the result has no diff"),
        }
    }

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            println!("{}", format_result_summary(&result));
        }
        None => println!("{json}"),
    }

    Ok(result)
}

pub fn format_result_summary(result: &AnalysisResult) -> String {
    let mut lines = vec![format!(
        "{} elements in {:.1} ms",
        result.elements.len(),
        result.performance.total_time
    )];
    if let Some(diff) = &result.dom_diff {
        lines.push(format_diff_summary(diff));
    }
    if let Some(graph) = &result.dependency_graph {
        lines.push(format!(
            "graph: {} edges, {} cycles, {} critical nodes",
            graph.summary.total_edges,
            graph.summary.cycle_count,
            graph.summary.critical_nodes.len()
        ));
    }
    lines.push(format!("patterns: {}", result.detected_patterns.len()));
    for warning in &result.warnings {
        lines.push(format!("warning: {}", warning.message));
    }
    lines.join("\n")
}

// ============================================================================
// diff subcommand
// ============================================================================

/// Diff two page dumps. Returns the config repairs and snapshot warnings
/// alongside the diff.
pub fn diff_pages(before: &str, after: &str, config: &AnalysisConfig) -> CmdResult<(DiffResult, Vec<Warning>)> {
    let (config, mut warnings) = config.clone().sanitized();
    let snapshotter = ElementSnapshotter::new();
    let options = config.snapshot_options();

    let before_page = load_page(before)?;
    let after_page = load_page(after)?;
    let previous = snapshotter.snapshot(&before_page.root, before_page.url.as_deref(), &options)?;
    let current = snapshotter.snapshot(&after_page.root, after_page.url.as_deref(), &options)?;
    warnings.extend(previous.warnings.iter().cloned());
    warnings.extend(current.warnings.iter().cloned());

    Ok((compare(&previous, &current, &config.diff_options()), warnings))
}

pub fn cmd_diff(before: &str, after: &str, config: &AnalysisConfig) -> CmdResult<DiffResult> {
    let (diff, warnings) = diff_pages(before, after, config)?;
    print_warnings(&warnings);
    println!("{}", format_diff_summary(&diff));
    for change in diff.changes.iter() {
        println!(
            "  {:?} {:?} {}",
            change.significance, change.change_type, change.element.selector
        );
    }
    Ok(diff)
}

pub fn format_diff_summary(diff: &DiffResult) -> String {
    if diff.is_baseline {
        return "diff: baseline stored".to_string();
    }
    let s = &diff.summary;
    format!(
        "diff: +{} -{} ~{} moved {} ({} significant, rate {:.2})",
        s.added, s.removed, s.modified, s.moved, s.significant, diff.change_rate
    )
}

// ============================================================================
// patterns subcommand
// ============================================================================

/// Recognize patterns on a page dump. The returned warnings include config
/// repairs and snapshot warnings.
pub fn recognize_page(input: &str, library: Option<&str>, config: &AnalysisConfig) -> CmdResult<Recognition> {
    let (config, mut warnings) = config.clone().sanitized();
    let page = load_page(input)?;
    let snapshot = ElementSnapshotter::new().snapshot(&page.root, page.url.as_deref(), &config.snapshot_options())?;
    let index = DocumentIndex::build(&page.root, config.max_depth);

    let mut options = config.pattern_options();
    if let Some(path) = library {
        options.library = Some(PatternLibrary::from_yaml_file(path)?.patterns);
    }

    let mut recognition = PatternRecognizer::new().recognize(&snapshot, &index, &options);
    warnings.extend(snapshot.warnings);
    warnings.append(&mut recognition.warnings);
    recognition.warnings = warnings;
    Ok(recognition)
}

pub fn cmd_patterns(input: &str, library: Option<&str>, config: &AnalysisConfig) -> CmdResult<Vec<PatternMatch>> {
    let recognition = recognize_page(input, library, config)?;
    print_warnings(&recognition.warnings);
    for m in &recognition.matches {
        println!(
            "{:<40} {:<20} {:.2} ({} elements)",
            m.name,
            m.pattern_type,
            m.confidence,
            m.matched_elements.len()
        );
    }
    Ok(recognition.matches)
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning.message);
    }
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(session: Option<&str>, app: &AppConfig) -> CmdResult<()> {
    let store = FileResultStore::new(&app.store.directory);
    let mut handler = RequestHandler::new(Box::new(store))
        .with_config(app.analysis.clone())
        .with_session(session.unwrap_or(DEFAULT_SESSION));

    if let Some(endpoint) = &app.delivery.endpoint {
        handler = handler.with_delivery(Box::new(HttpDelivery::new(endpoint)?));
    }

    handler.serve(io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
