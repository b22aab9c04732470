use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::analysis::result::AnalysisResult;

/// Milliseconds since the Unix epoch; zero if the clock is before it.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// One line of the JSONL trace: a condensed record of an analysis pass.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub pass: u64,

    pub url: Option<String>,
    pub elements: usize,

    pub added: Option<usize>,
    pub removed: Option<usize>,
    pub modified: Option<usize>,
    pub moved: Option<usize>,

    pub patterns: usize,
    pub cycles: Option<usize>,
    pub warnings: Vec<String>,

    pub total_ms: f64,
}

impl TraceEvent {
    pub fn now(pass: u64) -> Self {
        Self {
            timestamp_ms: now_ms(),
            pass,
            url: None,
            elements: 0,
            added: None,
            removed: None,
            modified: None,
            moved: None,
            patterns: 0,
            cycles: None,
            warnings: vec![],
            total_ms: 0.0,
        }
    }

    pub fn with_result(mut self, result: &AnalysisResult) -> Self {
        self.url = result.url.clone();
        self.elements = result.elements.len();
        if let Some(diff) = &result.dom_diff {
            self.added = Some(diff.summary.added);
            self.removed = Some(diff.summary.removed);
            self.modified = Some(diff.summary.modified);
            self.moved = Some(diff.summary.moved);
        }
        self.patterns = result.detected_patterns.len();
        self.cycles = result.dependency_graph.as_ref().map(|g| g.cycles.len());
        self.warnings = result.warnings.iter().map(|w| w.message.clone()).collect();
        self.total_ms = result.performance.total_time;
        self
    }
}
