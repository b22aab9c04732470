use serde::{Deserialize, Serialize};

use crate::analysis::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::snapshot::snapshot_model::ElementRecord;
use crate::trace::trace::now_ms;

const REF_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    pub ignore_attributes: Vec<String>,
    pub ignore_whitespace: bool,
    pub similarity_threshold: f64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_attributes: vec!["style".into(), "data-timestamp".into()],
            ignore_whitespace: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Moved,
}

/// Coarse severity of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationKind {
    Attribute,
    Text,
    State,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub kind: ModificationKind,
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Enough of an element to locate it without the snapshot it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub tag_name: String,
    pub selector: String,
    pub path: String,
    pub text: Option<String>,
}

impl From<&ElementRecord> for ElementRef {
    fn from(record: &ElementRecord) -> Self {
        ElementRef {
            tag_name: record.tag_name.clone(),
            selector: record.selector.clone(),
            path: record.xpath.clone(),
            text: record
                .text_content
                .as_ref()
                .map(|t| t.chars().take(REF_TEXT_CHARS).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub path: String,
    /// Path in the previous snapshot, set for moved elements.
    pub previous_path: Option<String>,
    pub element: ElementRef,
    pub modifications: Vec<Modification>,
    pub significance: Significance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<ChangeRecord>,
    pub removed: Vec<ChangeRecord>,
    pub modified: Vec<ChangeRecord>,
    pub moved: Vec<ChangeRecord>,
}

impl ChangeSet {
    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len() + self.moved.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.modified)
            .chain(&self.moved)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub moved: usize,
    pub total: usize,
    pub significant: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub timestamp: u128,
    /// True when there was no baseline to compare against.
    pub is_baseline: bool,
    pub changes: ChangeSet,
    pub summary: DiffSummary,
    pub change_rate: f64,
    pub significant_changes: Vec<ChangeRecord>,
}

impl DiffResult {
    /// Zero-change result for the first snapshot of a session.
    pub fn baseline() -> Self {
        Self {
            timestamp: now_ms(),
            is_baseline: true,
            changes: ChangeSet::default(),
            summary: DiffSummary::default(),
            change_rate: 0.0,
            significant_changes: vec![],
        }
    }

    pub fn from_changes(changes: ChangeSet, current_nodes: usize) -> Self {
        let significant_changes: Vec<ChangeRecord> = changes
            .iter()
            .filter(|c| c.significance == Significance::High)
            .cloned()
            .collect();
        let total = changes.total();

        Self {
            timestamp: now_ms(),
            is_baseline: false,
            summary: DiffSummary {
                added: changes.added.len(),
                removed: changes.removed.len(),
                modified: changes.modified.len(),
                moved: changes.moved.len(),
                total,
                significant: significant_changes.len(),
            },
            change_rate: if current_nodes == 0 {
                0.0
            } else {
                total as f64 / current_nodes as f64
            },
            changes,
            significant_changes,
        }
    }
}
