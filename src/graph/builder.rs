use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::graph::cycles::detect_cycles;
use crate::graph::graph_model::{
    DependencyEdge, DependencyGraph, EdgeType, GraphNode, GraphOptions, GraphSummary, Strength,
};
use crate::snapshot::extract::is_form_control;
use crate::snapshot::snapshot_model::ElementRecord;

const ARIA_REFERENCES: [&str; 4] = [
    "aria-labelledby",
    "aria-describedby",
    "aria-controls",
    "aria-owns",
];

const TOGGLE_TARGETS: [&str; 2] = ["data-target", "data-bs-target"];

/// Infers relationships between the elements of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder;

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the graph over `elements`, which must be a snapshot's flat list
    /// (record `parent` fields index into it).
    pub fn build(&self, elements: &[ElementRecord], options: &GraphOptions) -> DependencyGraph {
        let doc = Document::new(elements);
        let mut edges = Edges::default();

        structural_edges(&doc, &mut edges);
        if options.forms {
            form_edges(&doc, &mut edges);
        }
        if options.labels {
            label_edges(&doc, &mut edges);
        }
        if options.aria {
            aria_edges(&doc, &mut edges);
        }
        if options.classes {
            class_edges(&doc, &mut edges);
        }
        if options.events {
            event_edges(&doc, &mut edges);
        }

        let edges = edges.list;
        let cycles = detect_cycles(&edges, options.max_dependency_depth);
        let nodes = nodes_with_degree(elements, &edges);
        let summary = summarize(&nodes, &edges, cycles.len(), options.critical_node_degree);

        debug!(
            nodes = summary.total_nodes,
            edges = summary.total_edges,
            cycles = summary.cycle_count,
            "dependency graph built"
        );

        DependencyGraph {
            nodes,
            edges,
            cycles,
            summary,
        }
    }
}

// ============================================================================
// Lookup helpers
// ============================================================================

struct Document<'a> {
    elements: &'a [ElementRecord],
    by_id: HashMap<&'a str, usize>,
}

impl<'a> Document<'a> {
    fn new(elements: &'a [ElementRecord]) -> Self {
        let mut by_id = HashMap::new();
        for (i, el) in elements.iter().enumerate() {
            if let Some(id) = el.id() {
                by_id.entry(id).or_insert(i);
            }
        }
        Self { elements, by_id }
    }

    fn path(&self, i: usize) -> &'a str {
        &self.elements[i].xpath
    }

    fn lookup_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    fn parent(&self, i: usize) -> Option<usize> {
        self.elements[i]
            .parent
            .filter(|&p| p < self.elements.len() && p != i)
    }

    /// Nearest recorded ancestor whose tag satisfies `accept`.
    fn ancestor(&self, i: usize, accept: impl Fn(&str) -> bool) -> Option<usize> {
        let mut cur = self.parent(i);
        let mut guard = 0;
        while let Some(p) = cur {
            if accept(&self.elements[p].tag_name) {
                return Some(p);
            }
            guard += 1;
            if guard > self.elements.len() {
                return None;
            }
            cur = self.parent(p);
        }
        None
    }

    fn is_descendant_of(&self, i: usize, ancestor: usize) -> bool {
        let mut cur = self.parent(i);
        let mut guard = 0;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            guard += 1;
            if guard > self.elements.len() {
                return false;
            }
            cur = self.parent(p);
        }
        false
    }
}

#[derive(Default)]
struct Edges {
    list: Vec<DependencyEdge>,
    seen: HashSet<(String, String, EdgeType)>,
}

impl Edges {
    fn push(&mut self, edge: DependencyEdge) {
        if edge.from == edge.to && edge.edge_type.is_structural() {
            return;
        }
        if self
            .seen
            .insert((edge.from.clone(), edge.to.clone(), edge.edge_type))
        {
            self.list.push(edge);
        }
    }
}

// ============================================================================
// Edge inference
// ============================================================================

/// Child → container edges. Always on; acyclic by construction.
fn structural_edges(doc: &Document, edges: &mut Edges) {
    for (i, el) in doc.elements.iter().enumerate() {
        let Some(parent) = doc.parent(i) else {
            continue;
        };
        let from = doc.path(i);
        edges.push(DependencyEdge::new(
            from,
            doc.path(parent),
            EdgeType::ParentChild,
            Strength::Strong,
        ));

        let container = match el.tag_name.as_str() {
            "li" => doc
                .ancestor(i, |t| matches!(t, "ul" | "ol" | "menu"))
                .map(|c| (c, EdgeType::ListItem)),
            "td" | "th" => doc.ancestor(i, |t| t == "tr").map(|c| (c, EdgeType::TableCell)),
            "option" => doc
                .ancestor(i, |t| matches!(t, "select" | "datalist"))
                .map(|c| (c, EdgeType::SelectOption)),
            _ => None,
        };
        if let Some((c, edge_type)) = container {
            edges.push(DependencyEdge::new(from, doc.path(c), edge_type, Strength::Strong));
        }
    }
}

fn form_edges(doc: &Document, edges: &mut Edges) {
    for (i, el) in doc.elements.iter().enumerate() {
        if !is_form_control(&el.tag_name) {
            continue;
        }
        let owner = match el.attr("form").filter(|f| !f.is_empty()) {
            Some(form_id) => doc
                .lookup_id(form_id)
                .filter(|&f| doc.elements[f].tag_name == "form"),
            None => doc.ancestor(i, |t| t == "form"),
        };
        if let Some(form) = owner {
            let mut edge =
                DependencyEdge::new(doc.path(i), doc.path(form), EdgeType::FormControl, Strength::Strong);
            if el.attr("form").is_some() {
                edge = edge.via("form");
            }
            edges.push(edge);
        }
    }
}

fn label_edges(doc: &Document, edges: &mut Edges) {
    for (i, el) in doc.elements.iter().enumerate() {
        if el.tag_name != "label" {
            continue;
        }
        let target = match el.attr("for").filter(|f| !f.is_empty()) {
            Some(target_id) => doc.lookup_id(target_id),
            None => (i + 1..doc.elements.len())
                .take_while(|&j| doc.is_descendant_of(j, i))
                .find(|&j| is_form_control(&doc.elements[j].tag_name)),
        };
        if let Some(t) = target {
            let mut edge = DependencyEdge::new(doc.path(i), doc.path(t), EdgeType::Label, Strength::Strong);
            if el.attr("for").is_some() {
                edge = edge.via("for");
            }
            edges.push(edge);
        }
    }
}

fn aria_edges(doc: &Document, edges: &mut Edges) {
    for (i, el) in doc.elements.iter().enumerate() {
        for attribute in ARIA_REFERENCES {
            let Some(ids) = el.attr(attribute) else {
                continue;
            };
            for id in ids.split_whitespace() {
                if let Some(t) = doc.lookup_id(id) {
                    edges.push(
                        DependencyEdge::new(doc.path(i), doc.path(t), EdgeType::AriaReference, Strength::Strong)
                            .via(attribute),
                    );
                }
            }
        }
    }
}

/// Chains consecutive members of each shared class in document order.
fn class_edges(doc: &Document, edges: &mut Edges) {
    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, el) in doc.elements.iter().enumerate() {
        for class in el.classes() {
            members.entry(class).or_default().push(i);
        }
    }

    for (class, group) in members {
        for pair in group.windows(2) {
            edges.push(
                DependencyEdge::new(doc.path(pair[0]), doc.path(pair[1]), EdgeType::ClassGroup, Strength::Medium)
                    .via(&format!("class:{class}")),
            );
        }
    }
}

fn event_edges(doc: &Document, edges: &mut Edges) {
    for (i, el) in doc.elements.iter().enumerate() {
        for (name, value) in &el.attributes {
            if name.starts_with("on") && name.len() > 2 {
                for (t, target) in doc.elements.iter().enumerate() {
                    let Some(id) = target.id() else {
                        continue;
                    };
                    if t != i && doc.lookup_id(id) == Some(t) && handler_references(value, id) {
                        edges.push(
                            DependencyEdge::new(doc.path(i), doc.path(t), EdgeType::Event, Strength::Medium)
                                .via(name),
                        );
                    }
                }
            }
        }

        let toggles = TOGGLE_TARGETS
            .iter()
            .filter_map(|a| el.attr(a).map(|v| (*a, v)))
            .chain(
                el.attr("href")
                    .filter(|_| el.attr("aria-controls").is_none())
                    .map(|v| ("href", v)),
            );
        for (attribute, value) in toggles {
            let Some(id) = value.strip_prefix('#').filter(|id| !id.is_empty()) else {
                continue;
            };
            if let Some(t) = doc.lookup_id(id).filter(|&t| t != i) {
                edges.push(
                    DependencyEdge::new(doc.path(i), doc.path(t), EdgeType::Event, Strength::Weak)
                        .via(attribute),
                );
            }
        }
    }
}

/// `getElementById('x')`, `"#x"` and similar literal references.
fn handler_references(handler: &str, id: &str) -> bool {
    [format!("'{id}'"), format!("\"{id}\""), format!("'#{id}'"), format!("\"#{id}\"")]
        .iter()
        .any(|needle| handler.contains(needle.as_str()))
}

// ============================================================================
// Summary
// ============================================================================

fn nodes_with_degree(elements: &[ElementRecord], edges: &[DependencyEdge]) -> Vec<GraphNode> {
    let mut degree: HashMap<&str, (usize, usize)> = HashMap::new();
    for edge in edges {
        degree.entry(edge.from.as_str()).or_default().1 += 1;
        degree.entry(edge.to.as_str()).or_default().0 += 1;
    }

    elements
        .iter()
        .map(|el| {
            let (in_degree, out_degree) = degree.get(el.xpath.as_str()).copied().unwrap_or_default();
            GraphNode {
                id: el.xpath.clone(),
                tag_name: el.tag_name.clone(),
                label: el.label(),
                in_degree,
                out_degree,
            }
        })
        .collect()
}

fn summarize(
    nodes: &[GraphNode],
    edges: &[DependencyEdge],
    cycle_count: usize,
    critical_degree: usize,
) -> GraphSummary {
    let mut edges_by_type = BTreeMap::new();
    for edge in edges {
        *edges_by_type.entry(edge.edge_type.to_string()).or_insert(0) += 1;
    }

    GraphSummary {
        total_nodes: nodes.len(),
        total_edges: edges.len(),
        edges_by_type,
        critical_nodes: nodes
            .iter()
            .filter(|n| n.degree() > critical_degree)
            .map(|n| n.id.clone())
            .collect(),
        isolated_nodes: nodes
            .iter()
            .filter(|n| n.degree() == 0)
            .map(|n| n.id.clone())
            .collect(),
        cycle_count,
    }
}
