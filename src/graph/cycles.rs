use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::graph_model::{Cycle, DependencyEdge, Strength};

/// Find cycles with a depth-first search over `edges`.
///
/// Every back edge closes one cycle. Paths longer than `max_depth` are not
/// followed, and cycles over the same set of nodes are reported once.
pub fn detect_cycles(edges: &[DependencyEdge], max_depth: usize) -> Vec<Cycle> {
    let mut adjacency: HashMap<&str, Vec<&DependencyEdge>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut known: HashSet<&str> = HashSet::new();

    for edge in edges {
        adjacency.entry(edge.from.as_str()).or_default().push(edge);
        for node in [edge.from.as_str(), edge.to.as_str()] {
            if known.insert(node) {
                order.push(node);
            }
        }
    }

    let mut search = Search {
        adjacency: &adjacency,
        max_depth: max_depth.max(1),
        explored_at: HashMap::new(),
        path: Vec::new(),
        path_edges: Vec::new(),
        seen_sets: HashSet::new(),
        cycles: Vec::new(),
    };

    for node in order {
        if !search.explored_at.contains_key(node) {
            search.visit(node);
        }
    }

    search.cycles
}

struct Search<'a> {
    adjacency: &'a HashMap<&'a str, Vec<&'a DependencyEdge>>,
    max_depth: usize,
    /// Shallowest path position each node was expanded from. A node cut off
    /// by `max_depth` is expanded again when reached higher up.
    explored_at: HashMap<&'a str, usize>,
    path: Vec<&'a str>,
    path_edges: Vec<&'a DependencyEdge>,
    seen_sets: HashSet<BTreeSet<&'a str>>,
    cycles: Vec<Cycle>,
}

impl<'a> Search<'a> {
    fn visit(&mut self, node: &'a str) {
        self.explored_at.insert(node, self.path.len());
        self.path.push(node);

        let adjacency = self.adjacency;
        for &edge in adjacency.get(node).into_iter().flatten() {
            let next = edge.to.as_str();
            if let Some(pos) = self.path.iter().position(|n| *n == next) {
                self.close(pos, edge);
            } else if self.path.len() <= self.max_depth && self.is_shallower(next) {
                self.path_edges.push(edge);
                self.visit(next);
                self.path_edges.pop();
            }
        }

        self.path.pop();
    }

    fn is_shallower(&self, next: &str) -> bool {
        self.explored_at
            .get(next)
            .is_none_or(|&depth| depth > self.path.len())
    }

    /// Record the cycle running from `path[start]` back to itself via `closing`.
    fn close(&mut self, start: usize, closing: &'a DependencyEdge) {
        let nodes = &self.path[start..];
        let set: BTreeSet<&str> = nodes.iter().copied().collect();
        if !self.seen_sets.insert(set) {
            return;
        }

        let mut cycle_edges: Vec<&DependencyEdge> = self.path_edges[start..].to_vec();
        cycle_edges.push(closing);

        let strength = cycle_edges
            .iter()
            .map(|e| e.strength)
            .min()
            .unwrap_or(Strength::Weak);
        let first = cycle_edges[0].edge_type;
        let cycle_type = if cycle_edges.iter().all(|e| e.edge_type == first) {
            first.to_string()
        } else {
            "mixed".to_string()
        };

        self.cycles.push(Cycle {
            cycle: nodes.iter().map(|n| n.to_string()).collect(),
            length: nodes.len(),
            strength,
            cycle_type,
        });
    }
}
