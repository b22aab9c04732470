use std::collections::BTreeMap;

use tracing::debug;

use crate::dom::dom_model::DomSource;
use crate::dom::selector::{ElementView, SelectorList};

/// Hard ceiling on how many elements the live-document index holds.
pub const MAX_INDEXED_ELEMENTS: usize = 10_000;

/// 1-based position of every child among the siblings sharing its tag name.
pub fn type_positions<N: DomSource>(children: &[N]) -> Vec<usize> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    children
        .iter()
        .map(|child| {
            let n = seen.entry(child.tag_name().to_ascii_lowercase()).or_insert(0);
            *n += 1;
            *n
        })
        .collect()
}

/// Structural path segment of every child: `tag[n]`.
pub fn child_segments<N: DomSource>(children: &[N]) -> Vec<String> {
    children
        .iter()
        .zip(type_positions(children))
        .map(|(child, n)| format!("{}[{n}]", child.tag_name().to_ascii_lowercase()))
        .collect()
}

/// Path of the root element.
pub fn root_path<N: DomSource>(root: &N) -> String {
    format!("/{}[1]", root.tag_name().to_ascii_lowercase())
}

pub fn to_view(tag: &str, attributes: &[(String, String)]) -> ElementView {
    let mut map = BTreeMap::new();
    for (name, value) in attributes {
        map.entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.clone());
    }
    ElementView::new(tag, map)
}

#[derive(Debug, Clone)]
struct IndexedElement {
    path: String,
    depth: usize,
    view: ElementView,
}

/// Flattened view of the live document used for selector queries.
///
/// Unlike a snapshot, the index ignores visibility and filter rules: a
/// selector query sees every element the page has.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    entries: Vec<IndexedElement>,
}

impl DocumentIndex {
    pub fn build<N: DomSource>(root: &N, max_depth: usize) -> Self {
        let mut index = DocumentIndex::default();
        index.visit(root, root_path(root), 0, max_depth);
        debug!(elements = index.entries.len(), "document index built");
        index
    }

    fn visit<N: DomSource>(&mut self, node: &N, path: String, depth: usize, max_depth: usize) {
        if depth > max_depth || self.entries.len() >= MAX_INDEXED_ELEMENTS {
            return;
        }

        let view = match node.attributes() {
            Ok(attrs) => to_view(node.tag_name(), &attrs),
            Err(_) => ElementView::bare(node.tag_name()),
        };
        self.entries.push(IndexedElement {
            path: path.clone(),
            depth,
            view,
        });

        let children = node.children();
        for (child, segment) in children.iter().zip(child_segments(children)) {
            self.visit(child, format!("{path}/{segment}"), depth + 1, max_depth);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Structural paths of every element matching `selector`, in document order.
    pub fn query(&self, selector: &SelectorList) -> Vec<String> {
        let mut stack: Vec<ElementView> = Vec::new();
        let mut matched = Vec::new();

        for entry in &self.entries {
            stack.truncate(entry.depth);
            if selector.matches(&entry.view, &stack) {
                matched.push(entry.path.clone());
            }
            stack.push(entry.view.clone());
        }

        matched
    }
}
