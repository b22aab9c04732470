use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, warn};

use crate::analysis::config::AnalysisConfig;
use crate::analysis::extraction::comprehensive_extraction;
use crate::analysis::result::{AnalysisResult, MultiStageFlow, Performance, StageRecord, StageStatus};
use crate::diff::diff_model::{DiffOptions, DiffResult};
use crate::diff::engine::DiffEngine;
use crate::dom::dom_model::{DomPage, DomSource, PageInfo};
use crate::dom::index::DocumentIndex;
use crate::error::{AnalysisError, Warning, WarningKind};
use crate::graph::builder::DependencyGraphBuilder;
use crate::graph::graph_model::{DependencyGraph, GraphOptions};
use crate::pattern::pattern_model::PatternOptions;
use crate::pattern::recognizer::{PatternRecognizer, Recognition};
use crate::snapshot::format::format_tree;
use crate::snapshot::snapshot_model::{ElementRecord, Snapshot};
use crate::snapshot::snapshotter::ElementSnapshotter;
use crate::trace::trace::now_ms;

pub const STAGE_SNAPSHOT: &str = "snapshot";
pub const STAGE_DIFF: &str = "diff";
pub const STAGE_GRAPH: &str = "dependencyGraph";
pub const STAGE_PATTERNS: &str = "patterns";
pub const STAGE_EXTRACTION: &str = "comprehensiveExtraction";

// ============================================================================
// Stage seams
// ============================================================================

pub trait DiffStage: Send {
    fn diff(&mut self, current: &Snapshot, options: &DiffOptions) -> Result<DiffResult, AnalysisError>;
    fn reset(&mut self);
}

pub trait GraphStage: Send {
    fn build(&self, elements: &[ElementRecord], options: &GraphOptions) -> Result<DependencyGraph, AnalysisError>;
}

pub trait PatternStage: Send {
    fn recognize(
        &self,
        snapshot: &Snapshot,
        index: &DocumentIndex,
        options: &PatternOptions,
    ) -> Result<Recognition, AnalysisError>;
}

impl DiffStage for DiffEngine {
    fn diff(&mut self, current: &Snapshot, options: &DiffOptions) -> Result<DiffResult, AnalysisError> {
        Ok(DiffEngine::diff(self, current, options))
    }

    fn reset(&mut self) {
        DiffEngine::reset(self);
    }
}

impl GraphStage for DependencyGraphBuilder {
    fn build(&self, elements: &[ElementRecord], options: &GraphOptions) -> Result<DependencyGraph, AnalysisError> {
        Ok(DependencyGraphBuilder::build(self, elements, options))
    }
}

impl PatternStage for PatternRecognizer {
    fn recognize(
        &self,
        snapshot: &Snapshot,
        index: &DocumentIndex,
        options: &PatternOptions,
    ) -> Result<Recognition, AnalysisError> {
        Ok(PatternRecognizer::recognize(self, snapshot, index, options))
    }
}

// ============================================================================
// Flow control
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Running,
    Paused,
    Canceled,
}

/// Cooperative pause/resume/cancel for a running analysis.
///
/// Checked between stages only. Clones share state, so a handle can be
/// given to another thread before calling `analyze`.
#[derive(Debug, Clone)]
pub struct FlowControl {
    inner: Arc<(Mutex<FlowState>, Condvar)>,
}

impl Default for FlowControl {
    fn default() -> Self {
        Self {
            inner: Arc::new((Mutex::new(FlowState::Running), Condvar::new())),
        }
    }
}

impl FlowControl {
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, state: FlowState) {
        *self.lock() = state;
        self.inner.1.notify_all();
    }

    pub fn state(&self) -> FlowState {
        *self.lock()
    }

    pub fn pause(&self) {
        let mut state = self.lock();
        if *state == FlowState::Running {
            *state = FlowState::Paused;
        }
    }

    pub fn resume(&self) {
        let mut state = self.lock();
        if *state == FlowState::Paused {
            *state = FlowState::Running;
            self.inner.1.notify_all();
        }
    }

    pub fn cancel(&self) {
        self.set(FlowState::Canceled);
    }

    /// Back to running, for the next pass.
    pub fn reset(&self) {
        self.set(FlowState::Running);
    }

    /// Block while paused; fail if canceled.
    pub fn checkpoint(&self) -> Result<(), AnalysisError> {
        let mut state = self.lock();
        while *state == FlowState::Paused {
            state = self
                .inner
                .1
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        match *state {
            FlowState::Canceled => Err(AnalysisError::Canceled),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Stage bookkeeping
// ============================================================================

struct StageTracker {
    enabled: bool,
    max_stages: usize,
    started: usize,
    flow: MultiStageFlow,
    times: BTreeMap<String, f64>,
}

impl StageTracker {
    fn new(config: &AnalysisConfig) -> Self {
        Self {
            enabled: config.multi_stage_enabled,
            max_stages: config.max_stages,
            started: 0,
            flow: MultiStageFlow {
                max_stages: config.max_stages,
                stages: vec![],
            },
            times: BTreeMap::new(),
        }
    }

    /// Whether another stage may start.
    fn admit(&mut self) -> bool {
        if self.enabled && self.started >= self.max_stages {
            return false;
        }
        self.started += 1;
        true
    }

    fn record(&mut self, name: &str, status: StageStatus, duration_ms: f64) {
        if status == StageStatus::Completed || status == StageStatus::Failed {
            self.times.insert(name.to_string(), duration_ms);
        }
        self.flow.stages.push(StageRecord {
            name: name.to_string(),
            status,
            duration_ms,
        });
    }

    fn finish(self) -> (Option<MultiStageFlow>, BTreeMap<String, f64>) {
        let flow = self.enabled.then_some(self.flow);
        (flow, self.times)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Run one optional stage. Only cancellation escapes; any other failure
/// becomes a warning and a `None` result.
fn run_stage<T>(
    flow: &FlowControl,
    tracker: &mut StageTracker,
    warnings: &mut Vec<Warning>,
    name: &str,
    enabled: bool,
    stage: impl FnOnce() -> Result<T, AnalysisError>,
) -> Result<Option<T>, AnalysisError> {
    flow.checkpoint()?;

    if !enabled {
        tracker.record(name, StageStatus::Disabled, 0.0);
        return Ok(None);
    }
    if !tracker.admit() {
        warnings.push(Warning::new(
            WarningKind::Stage,
            format!("stage '{name}' skipped: maxStages ({}) reached", tracker.max_stages),
        ));
        tracker.record(name, StageStatus::Skipped, 0.0);
        return Ok(None);
    }

    let started = Instant::now();
    let outcome = stage();
    let duration = elapsed_ms(started);

    match outcome {
        Ok(value) => {
            debug!(stage = name, duration_ms = duration, "stage complete");
            tracker.record(name, StageStatus::Completed, duration);
            Ok(Some(value))
        }
        Err(AnalysisError::Canceled) => Err(AnalysisError::Canceled),
        Err(e) => {
            warn!(stage = name, error = %e, "stage failed");
            let err = match e {
                stage_err @ AnalysisError::Stage { .. } => stage_err,
                other => AnalysisError::stage(name, other),
            };
            warnings.push(Warning::from_error(&err));
            tracker.record(name, StageStatus::Failed, duration);
            Ok(None)
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs snapshot, diff, dependency graph, pattern recognition and summary
/// extraction in that order.
///
/// Every collaborator is passed in; [`AnalysisOrchestrator::default`] wires
/// the stock implementations. The diff stage keeps the previous snapshot, so
/// one orchestrator should serve one page session.
pub struct AnalysisOrchestrator {
    snapshotter: ElementSnapshotter,
    diff: Box<dyn DiffStage>,
    graph: Box<dyn GraphStage>,
    patterns: Box<dyn PatternStage>,
    flow: FlowControl,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(
            ElementSnapshotter::new(),
            Box::new(DiffEngine::new()),
            Box::new(DependencyGraphBuilder::new()),
            Box::new(PatternRecognizer::new()),
        )
    }
}

impl AnalysisOrchestrator {
    pub fn new(
        snapshotter: ElementSnapshotter,
        diff: Box<dyn DiffStage>,
        graph: Box<dyn GraphStage>,
        patterns: Box<dyn PatternStage>,
    ) -> Self {
        Self {
            snapshotter,
            diff,
            graph,
            patterns,
            flow: FlowControl::default(),
        }
    }

    /// Handle for pausing or canceling a pass from another thread.
    pub fn flow_control(&self) -> FlowControl {
        self.flow.clone()
    }

    /// Forget the diff baseline; the next pass is a baseline pass again.
    pub fn reset_baseline(&mut self) {
        self.diff.reset();
    }

    pub fn analyze_page(&mut self, page: &DomPage, config: &AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
        self.analyze(&page.root, &page.info(), config)
    }

    /// Analyze the tree under `root`.
    ///
    /// Fails only when the root itself is unusable or the pass is canceled;
    /// every other problem is reported through `warnings`.
    pub fn analyze<N: DomSource>(
        &mut self,
        root: &N,
        page: &PageInfo,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        let result = self.run(root, page, config);
        self.flow.reset();
        if let Err(e) = &result {
            warn!(error = %e, "analysis aborted");
        }
        result
    }

    fn run<N: DomSource>(
        &mut self,
        root: &N,
        page: &PageInfo,
        config: &AnalysisConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let (config, mut warnings) = config.clone().sanitized();
        let mut tracker = StageTracker::new(&config);

        self.flow.checkpoint()?;
        tracker.admit();
        let snapshot_started = Instant::now();
        let mut snapshot_options = config.snapshot_options();
        snapshot_options.viewport = page.viewport;
        let snapshot = self
            .snapshotter
            .snapshot(root, page.url.as_deref(), &snapshot_options)?;
        tracker.record(STAGE_SNAPSHOT, StageStatus::Completed, elapsed_ms(snapshot_started));

        warnings.extend(snapshot.warnings.iter().cloned());
        if snapshot.stats.truncated_by_depth || snapshot.stats.truncated_by_count {
            warnings.push(Warning::new(
                WarningKind::Truncated,
                format!(
                    "snapshot truncated at {} elements (maxDepth {}, maxElements {})",
                    snapshot.len(),
                    config.max_depth,
                    config.max_elements
                ),
            ));
        }
        if snapshot.stats.extraction_errors > 0 {
            warnings.push(Warning::new(
                WarningKind::Extraction,
                format!("{} elements could not be read and were skipped", snapshot.stats.extraction_errors),
            ));
        }

        let diff_options = config.diff_options();
        let diff = &mut self.diff;
        let dom_diff = run_stage(&self.flow, &mut tracker, &mut warnings, STAGE_DIFF, config.diff_enabled, || {
            diff.diff(&snapshot, &diff_options)
        })?;

        let graph_options = config.graph_options();
        let graph = &self.graph;
        let dependency_graph = run_stage(
            &self.flow,
            &mut tracker,
            &mut warnings,
            STAGE_GRAPH,
            config.dependency_tracking,
            || graph.build(&snapshot.flat, &graph_options),
        )?;

        let pattern_options = config.pattern_options();
        let patterns = &self.patterns;
        let recognition = run_stage(
            &self.flow,
            &mut tracker,
            &mut warnings,
            STAGE_PATTERNS,
            config.template_recognition,
            || {
                let index = DocumentIndex::build(root, config.max_depth);
                patterns.recognize(&snapshot, &index, &pattern_options)
            },
        )?;
        let detected_patterns = match recognition {
            Some(r) => {
                warnings.extend(r.warnings);
                r.matches
            }
            None => vec![],
        };

        let extraction = run_stage(
            &self.flow,
            &mut tracker,
            &mut warnings,
            STAGE_EXTRACTION,
            config.comprehensive_extraction,
            || Ok(comprehensive_extraction(&snapshot)),
        )?;

        let (multi_stage_flow, stage_times) = tracker.finish();
        let stats = &snapshot.stats;
        let performance = Performance {
            total_time: elapsed_ms(started),
            stage_times,
            elements_processed: snapshot.len(),
            elements_visited: stats.visited,
            cache_hits: stats.cache_hits,
            extraction_errors: stats.extraction_errors,
            truncated_by_depth: stats.truncated_by_depth,
            truncated_by_count: stats.truncated_by_count,
            timed_out: stats.timed_out,
        };

        debug!(
            elements = performance.elements_processed,
            total_ms = performance.total_time,
            warnings = warnings.len(),
            "analysis complete"
        );

        let formatted_tree = format_tree(&snapshot.tree);
        Ok(AnalysisResult {
            timestamp: now_ms(),
            url: page.url.clone(),
            title: page.title.clone(),
            config,
            dom_tree: snapshot.tree,
            elements: snapshot.flat,
            formatted_tree,
            dom_diff,
            dependency_graph,
            multi_stage_flow,
            detected_patterns,
            comprehensive_extraction: extraction,
            performance,
            warnings,
        })
    }
}
