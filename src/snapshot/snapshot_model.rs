use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::config::{
    DEFAULT_MAX_ATTRIBUTE_LENGTH, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ELEMENTS,
    DEFAULT_MAX_TEXT_LENGTH, DEFAULT_TIMEOUT_MS,
};
use crate::dom::dom_model::{Rect, Viewport};
use crate::error::Warning;

// ============================================================================
// Snapshot options
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotOptions {
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
    pub timeout: Duration,
    pub viewport: Option<Viewport>,
}

impl Default for SnapshotOptions {
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
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            viewport: None,
        }
    }
}

impl SnapshotOptions {
    /// Fingerprint of the options that influence per-element extraction.
    pub fn config_hash(&self) -> String {
        let material = format!(
            "{}|{}|{}|{}|{}",
            self.include_hidden,
            self.include_text,
            self.include_attributes,
            self.max_text_length,
            self.max_attribute_length
        );
        crate::identity::keys::fingerprint(&material)
    }
}

// ============================================================================
// Element records
// ============================================================================

/// Structural coordinates, recomputed on every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub depth: usize,
    pub sibling_index: usize,
    pub sibling_count: usize,
    pub child_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_interactive: bool,
    pub is_form_element: bool,
    pub is_visible: bool,
    pub is_in_viewport: bool,
}

/// Current state of a form element, recomputed on every pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementState {
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub selected: Option<bool>,
    pub disabled: bool,
    pub required: bool,
    pub valid: Option<bool>,
    pub validation_message: Option<String>,
}

/// One scraped element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
    /// Position in the flat list (pre-order).
    pub index: usize,
    /// Flat index of the nearest recorded ancestor.
    pub parent: Option<usize>,
    pub tag_name: String,
    pub attributes: BTreeMap<String, String>,
    pub text_content: Option<String>,
    pub position: Position,
    pub classification: Classification,
    pub rect: Option<Rect>,
    pub state: Option<ElementState>,
    pub xpath: String,
    pub selector: String,
    pub content_hash: String,
}

impl ElementRecord {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Short human-readable label, e.g. `input#email.wide`.
    pub fn label(&self) -> String {
        let mut out = self.tag_name.clone();
        if let Some(id) = self.id() {
            out.push('#');
            out.push_str(id);
        }
        for class in self.classes() {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTree {
    pub element: ElementRecord,
    pub children: Vec<SnapshotTree>,
}

impl SnapshotTree {
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SnapshotTree::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub visited: usize,
    pub extracted: usize,
    pub filtered: usize,
    pub extraction_errors: usize,
    pub cache_hits: usize,
    pub truncated_by_depth: bool,
    pub truncated_by_count: bool,
    pub timed_out: bool,
    pub duration_ms: f64,
}

/// One complete scrape of the page at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub url: Option<String>,
    pub tree: SnapshotTree,
    pub flat: Vec<ElementRecord>,
    pub stats: SnapshotStats,
    pub warnings: Vec<Warning>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    /// Tags of each record's recorded children, in document order.
    pub fn child_tags(&self) -> Vec<Vec<&str>> {
        let mut out: Vec<Vec<&str>> = vec![Vec::new(); self.flat.len()];
        for record in &self.flat {
            if let Some(parent) = record.parent {
                if let Some(slot) = out.get_mut(parent) {
                    slot.push(record.tag_name.as_str());
                }
            }
        }
        out
    }
}
