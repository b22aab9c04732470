use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diff::diff_model::DiffOptions;
use crate::error::{Warning, WarningKind};
use crate::graph::graph_model::GraphOptions;
use crate::pattern::pattern_model::{PatternDefinition, PatternOptions};
use crate::snapshot::snapshot_model::SnapshotOptions;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MAX_DEPTH: usize = 15;
pub const DEFAULT_MAX_ELEMENTS: usize = 1000;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 100;
pub const DEFAULT_MAX_ATTRIBUTE_LENGTH: usize = 200;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Minimum normalized similarity for a weak-key match. Hand-tuned.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
/// Minimum cluster size for signature patterns. Hand-tuned.
pub const DEFAULT_MIN_PATTERN_OCCURRENCES: usize = 2;
/// In+out degree above which a graph node counts as critical. Hand-tuned.
pub const DEFAULT_CRITICAL_NODE_DEGREE: usize = 5;
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 5;
pub const DEFAULT_MAX_STAGES: usize = 10;

/// Every option recognized by an analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    // ---- snapshot ----
    pub include_hidden: bool,
    pub include_text: bool,
    pub include_attributes: bool,
    pub only_form_elements: bool,
    pub max_depth: usize,
    pub max_elements: usize,
    pub max_text_length: usize,
    pub max_attribute_length: usize,
    pub css_filter: Option<String>,
    pub exclude_selectors: Vec<String>,
    pub include_only_selectors: Vec<String>,
    pub extraction_cache: bool,
    pub timeout_ms: u64,

    // ---- diff ----
    pub diff_enabled: bool,
    pub diff_ignore_attributes: Vec<String>,
    pub ignore_whitespace: bool,
    pub similarity_threshold: f64,

    // ---- dependency graph ----
    pub dependency_tracking: bool,
    pub max_dependency_depth: usize,
    pub critical_node_degree: usize,
    pub graph: GraphFlags,

    // ---- staging ----
    pub multi_stage_enabled: bool,
    pub max_stages: usize,

    // ---- patterns ----
    pub template_recognition: bool,
    pub pattern_library: Option<Vec<PatternDefinition>>,
    pub min_pattern_occurrences: usize,

    pub comprehensive_extraction: bool,
}

/// Which semantic relationships the graph builder infers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFlags {
    pub forms: bool,
    pub labels: bool,
    pub aria: bool,
    pub classes: bool,
    pub events: bool,
}

impl Default for GraphFlags {
    fn default() -> Self {
        Self {
            forms: true,
            labels: true,
            aria: true,
            classes: false,
            events: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_text: true,
            include_attributes: true,
            only_form_elements: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_elements: DEFAULT_MAX_ELEMENTS,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_attribute_length: DEFAULT_MAX_ATTRIBUTE_LENGTH,
            css_filter: None,
            exclude_selectors: vec![],
            include_only_selectors: vec![],
            extraction_cache: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,

            diff_enabled: true,
            diff_ignore_attributes: vec!["style".into(), "data-timestamp".into()],
            ignore_whitespace: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,

            dependency_tracking: true,
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            critical_node_degree: DEFAULT_CRITICAL_NODE_DEGREE,
            graph: GraphFlags::default(),

            multi_stage_enabled: true,
            max_stages: DEFAULT_MAX_STAGES,

            template_recognition: true,
            pattern_library: None,
            min_pattern_occurrences: DEFAULT_MIN_PATTERN_OCCURRENCES,

            comprehensive_extraction: true,
        }
    }
}

impl AnalysisConfig {
    /// Replace invalid numeric bounds with their defaults.
    ///
    /// Returns the repaired config and one configuration warning per repair.
    pub fn sanitized(mut self) -> (Self, Vec<Warning>) {
        let mut warnings = Vec::new();
        let mut repair = |field: &str, value: String, default: String| {
            warnings.push(Warning::new(
                WarningKind::Configuration,
                format!("invalid {field} = {value}, using default {default}"),
            ));
        };

        if self.max_depth == 0 {
            repair("maxDepth", "0".into(), DEFAULT_MAX_DEPTH.to_string());
            self.max_depth = DEFAULT_MAX_DEPTH;
        }
        if self.max_elements == 0 {
            repair("maxElements", "0".into(), DEFAULT_MAX_ELEMENTS.to_string());
            self.max_elements = DEFAULT_MAX_ELEMENTS;
        }
        if self.timeout_ms == 0 {
            repair("timeoutMs", "0".into(), DEFAULT_TIMEOUT_MS.to_string());
            self.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) || self.similarity_threshold.is_nan()
        {
            repair(
                "similarityThreshold",
                self.similarity_threshold.to_string(),
                DEFAULT_SIMILARITY_THRESHOLD.to_string(),
            );
            self.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        if self.min_pattern_occurrences < 2 {
            repair(
                "minPatternOccurrences",
                self.min_pattern_occurrences.to_string(),
                DEFAULT_MIN_PATTERN_OCCURRENCES.to_string(),
            );
            self.min_pattern_occurrences = DEFAULT_MIN_PATTERN_OCCURRENCES;
        }
        if self.max_stages == 0 {
            repair("maxStages", "0".into(), DEFAULT_MAX_STAGES.to_string());
            self.max_stages = DEFAULT_MAX_STAGES;
        }

        (self, warnings)
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            include_hidden: self.include_hidden,
            include_text: self.include_text,
            include_attributes: self.include_attributes,
            only_form_elements: self.only_form_elements,
            max_depth: self.max_depth,
            max_elements: self.max_elements,
            max_text_length: self.max_text_length,
            max_attribute_length: self.max_attribute_length,
            css_filter: self.css_filter.clone(),
            exclude_selectors: self.exclude_selectors.clone(),
            include_only_selectors: self.include_only_selectors.clone(),
            extraction_cache: self.extraction_cache,
            timeout: Duration::from_millis(self.timeout_ms),
            viewport: None,
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            ignore_attributes: self.diff_ignore_attributes.clone(),
            ignore_whitespace: self.ignore_whitespace,
            similarity_threshold: self.similarity_threshold,
        }
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            forms: self.graph.forms,
            labels: self.graph.labels,
            aria: self.graph.aria,
            classes: self.graph.classes,
            events: self.graph.events,
            max_dependency_depth: self.max_dependency_depth,
            critical_node_degree: self.critical_node_degree,
        }
    }

    pub fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            library: self.pattern_library.clone(),
            min_occurrences: self.min_pattern_occurrences,
        }
    }
}
