use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::config::AnalysisConfig;
use crate::diff::diff_model::DiffResult;
use crate::error::Warning;
use crate::graph::graph_model::DependencyGraph;
use crate::pattern::pattern_model::PatternMatch;
use crate::snapshot::snapshot_model::{ElementRecord, SnapshotTree};

/// Output of one analysis pass.
///
/// The shape never changes: a stage that was disabled or failed leaves its
/// field `null` and, when it failed, adds an entry to `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub timestamp: u128,
    pub url: Option<String>,
    pub title: Option<String>,
    pub config: AnalysisConfig,

    pub dom_tree: SnapshotTree,
    pub elements: Vec<ElementRecord>,
    pub formatted_tree: String,

    pub dom_diff: Option<DiffResult>,
    pub dependency_graph: Option<DependencyGraph>,
    pub multi_stage_flow: Option<MultiStageFlow>,
    pub detected_patterns: Vec<PatternMatch>,
    pub comprehensive_extraction: Option<ComprehensiveExtraction>,

    pub performance: Performance,
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Performance
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Wall time of the whole pass, in milliseconds.
    pub total_time: f64,
    pub stage_times: BTreeMap<String, f64>,
    pub elements_processed: usize,
    pub elements_visited: usize,
    pub cache_hits: usize,
    pub extraction_errors: usize,
    pub truncated_by_depth: bool,
    pub truncated_by_count: bool,
    pub timed_out: bool,
}

// ============================================================================
// Multi-stage flow
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Failed,
    Skipped,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub name: String,
    pub status: StageStatus,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiStageFlow {
    pub max_stages: usize,
    pub stages: Vec<StageRecord>,
}

impl MultiStageFlow {
    pub fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|s| s.status == status).count()
    }

    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.name == name)
    }
}

// ============================================================================
// Comprehensive extraction
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementCounts {
    pub total: usize,
    pub interactive: usize,
    pub form: usize,
    pub visible: usize,
    pub in_viewport: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub path: String,
    pub tag_name: String,
    pub field_type: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub path: String,
    pub selector: String,
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: String,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    pub role: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveExtraction {
    pub counts: ElementCounts,
    pub tag_counts: BTreeMap<String, usize>,
    pub forms: Vec<FormSummary>,
    pub headings: Vec<Heading>,
    pub link_count: usize,
    pub landmarks: Vec<Landmark>,
}
