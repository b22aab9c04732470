use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::config::{DEFAULT_CRITICAL_NODE_DEGREE, DEFAULT_MAX_DEPENDENCY_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    pub forms: bool,
    pub labels: bool,
    pub aria: bool,
    pub classes: bool,
    pub events: bool,
    pub max_dependency_depth: usize,
    pub critical_node_degree: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            forms: true,
            labels: true,
            aria: true,
            classes: false,
            events: true,
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            critical_node_degree: DEFAULT_CRITICAL_NODE_DEGREE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeType {
    ParentChild,
    ListItem,
    TableCell,
    SelectOption,
    FormControl,
    Label,
    AriaReference,
    ClassGroup,
    Event,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::ParentChild => "parent-child",
            EdgeType::ListItem => "list-item",
            EdgeType::TableCell => "table-cell",
            EdgeType::SelectOption => "select-option",
            EdgeType::FormControl => "form-control",
            EdgeType::Label => "label",
            EdgeType::AriaReference => "aria-reference",
            EdgeType::ClassGroup => "class-group",
            EdgeType::Event => "event",
        }
    }

    pub fn is_structural(self) -> bool {
        matches!(
            self,
            EdgeType::ParentChild | EdgeType::ListItem | EdgeType::TableCell | EdgeType::SelectOption
        )
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

/// Directed relationship between two elements, identified by structural path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub strength: Strength,
    /// Attribute the edge was inferred from, if any.
    pub attribute: Option<String>,
}

impl DependencyEdge {
    pub fn new(from: &str, to: &str, edge_type: EdgeType, strength: Strength) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            edge_type,
            strength,
            attribute: None,
        }
    }

    pub fn via(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub cycle: Vec<String>,
    pub length: usize,
    /// Weakest edge on the cycle.
    pub strength: Strength,
    /// Edge type shared by every edge, or `mixed`.
    #[serde(rename = "type")]
    pub cycle_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub tag_name: String,
    pub label: String,
    pub in_degree: usize,
    pub out_degree: usize,
}

impl GraphNode {
    pub fn degree(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub edges_by_type: BTreeMap<String, usize>,
    pub critical_nodes: Vec<String>,
    pub isolated_nodes: Vec<String>,
    pub cycle_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<DependencyEdge>,
    pub cycles: Vec<Cycle>,
    pub summary: GraphSummary,
}

impl DependencyGraph {
    pub fn edges_of_type(&self, edge_type: EdgeType) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }
}
