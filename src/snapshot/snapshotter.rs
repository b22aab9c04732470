use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::dom::dom_model::{DomSource, TextBudget};
use crate::dom::index::{root_path, to_view, type_positions};
use crate::dom::selector::{ElementView, SelectorList, parse_all};
use crate::error::{AnalysisError, Warning, WarningKind};
use crate::identity::keys::{build_selector, content_hash};
use crate::snapshot::extract::{
    TagTraits, extract_text, is_hidden, is_interactive, prepare_attributes, resolve_state,
    tag_traits,
};
use crate::snapshot::snapshot_model::{
    Classification, ElementRecord, Position, Snapshot, SnapshotOptions, SnapshotStats,
    SnapshotTree,
};

/// Walks an element tree and produces a bounded snapshot.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshotter;

impl ElementSnapshotter {
    pub fn new() -> Self {
        Self
    }

    /// Scan `root` depth-first, pre-order.
    ///
    /// Depth, element count and elapsed time are checked on every recursive
    /// step; whichever bound trips first ends the scan and the partial
    /// snapshot is returned. Only an unreadable root is an error.
    pub fn snapshot<N: DomSource>(
        &self,
        root: &N,
        url: Option<&str>,
        options: &SnapshotOptions,
    ) -> Result<Snapshot, AnalysisError> {
        if root.tag_name().trim().is_empty() {
            return Err(AnalysisError::fatal("root element has no tag name"));
        }
        if let Err(e) = root.attributes() {
            return Err(AnalysisError::fatal(format!("root element is unreadable: {e}")));
        }

        let mut pass = Pass::new(options);
        let location = Location {
            path: root_path(root),
            depth: 0,
            sibling_index: 0,
            sibling_count: 1,
            nth_of_type: 1,
        };
        let trees = pass.visit(root, location, None, true);
        pass.stats.duration_ms = pass.started.elapsed().as_secs_f64() * 1000.0;

        debug!(
            extracted = pass.stats.extracted,
            visited = pass.stats.visited,
            errors = pass.stats.extraction_errors,
            cache_hits = pass.stats.cache_hits,
            "snapshot complete"
        );

        let tree = trees
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::fatal("root element produced no record"))?;

        Ok(Snapshot {
            url: url.map(str::to_string),
            tree,
            flat: pass.flat,
            stats: pass.stats,
            warnings: pass.warnings,
        })
    }
}

// ============================================================================
// One traversal
// ============================================================================

struct Location {
    path: String,
    depth: usize,
    sibling_index: usize,
    sibling_count: usize,
    nth_of_type: usize,
}

struct Filters {
    exclude: Vec<SelectorList>,
    include_only: Vec<SelectorList>,
    css: Option<SelectorList>,
}

impl Filters {
    fn compile(options: &SnapshotOptions, warnings: &mut Vec<Warning>) -> Self {
        let mut report = |errors: Vec<crate::error::SelectorError>, list: &str| {
            for e in errors {
                warn!(list, error = %e, "dropping invalid selector");
                warnings.push(Warning::new(
                    WarningKind::Configuration,
                    format!("{list}: {e}"),
                ));
            }
        };

        let (exclude, errors) = parse_all(&options.exclude_selectors);
        report(errors, "excludeSelectors");
        let (include_only, errors) = parse_all(&options.include_only_selectors);
        report(errors, "includeOnlySelectors");

        let css = match options.css_filter.as_deref().map(SelectorList::parse) {
            Some(Ok(list)) => Some(list),
            Some(Err(e)) => {
                report(vec![e], "cssFilter");
                None
            }
            None => None,
        };

        // Invalid rules drop out; an include list left empty filters nothing.
        Self {
            exclude,
            include_only,
            css,
        }
    }
}

struct Pass<'o> {
    options: &'o SnapshotOptions,
    filters: Filters,
    config_hash: String,
    cache: HashMap<String, TagTraits>,
    max_elements: usize,
    flat: Vec<ElementRecord>,
    ancestors: Vec<ElementView>,
    stats: SnapshotStats,
    warnings: Vec<Warning>,
    started: Instant,
}

impl<'o> Pass<'o> {
    fn new(options: &'o SnapshotOptions) -> Self {
        let mut warnings = Vec::new();
        let filters = Filters::compile(options, &mut warnings);
        Self {
            options,
            filters,
            config_hash: options.config_hash(),
            cache: HashMap::new(),
            max_elements: options.max_elements.max(1),
            flat: Vec::new(),
            ancestors: Vec::new(),
            stats: SnapshotStats::default(),
            warnings,
            started: Instant::now(),
        }
    }

    /// Returns the trees produced by this subtree: one tree when the node is
    /// recorded, otherwise the trees of its recorded descendants.
    fn visit<N: DomSource>(
        &mut self,
        node: &N,
        location: Location,
        parent: Option<usize>,
        is_root: bool,
    ) -> Vec<SnapshotTree> {
        if !is_root && !self.within_budget(location.depth) {
            return Vec::new();
        }
        self.stats.visited += 1;

        let tag = node.tag_name().to_ascii_lowercase();
        let (view, record_index) = match node.attributes() {
            Ok(raw) => {
                let view = to_view(&tag, &raw);
                if is_root || self.passes_filters(node, &tag, &view) {
                    let index = self.flat.len();
                    let record = self.build_record(node, &tag, &raw, &location, parent, index);
                    self.flat.push(record);
                    self.stats.extracted += 1;
                    (view, Some(index))
                } else {
                    self.stats.filtered += 1;
                    (view, None)
                }
            }
            Err(e) => {
                let e = e.at(&location.path);
                warn!(error = %e, "skipping element");
                self.stats.extraction_errors += 1;
                (ElementView::bare(&tag), None)
            }
        };

        let children = node.children();
        let mut child_trees = Vec::new();
        self.ancestors.push(view);
        for (i, (child, nth)) in children.iter().zip(type_positions(children)).enumerate() {
            let child_location = Location {
                path: format!(
                    "{}/{}[{nth}]",
                    location.path,
                    child.tag_name().to_ascii_lowercase()
                ),
                depth: location.depth + 1,
                sibling_index: i,
                sibling_count: children.len(),
                nth_of_type: nth,
            };
            child_trees.extend(self.visit(child, child_location, record_index.or(parent), false));
        }
        self.ancestors.pop();

        match record_index {
            Some(index) => vec![SnapshotTree {
                element: self.flat[index].clone(),
                children: child_trees,
            }],
            None => child_trees,
        }
    }

    fn within_budget(&mut self, depth: usize) -> bool {
        if self.stats.timed_out {
            return false;
        }
        if self.started.elapsed() > self.options.timeout {
            self.stats.timed_out = true;
            warn!(timeout_ms = self.options.timeout.as_millis() as u64, "snapshot timed out");
            self.warnings.push(Warning::new(
                WarningKind::Timeout,
                format!(
                    "snapshot exceeded {} ms; {} elements captured",
                    self.options.timeout.as_millis(),
                    self.flat.len()
                ),
            ));
            return false;
        }
        if depth > self.options.max_depth {
            self.stats.truncated_by_depth = true;
            return false;
        }
        if self.flat.len() >= self.max_elements {
            self.stats.truncated_by_count = true;
            return false;
        }
        true
    }

    /// Visibility, exclude, include-only, css filter, form-only; in that order.
    fn passes_filters<N: DomSource>(&self, node: &N, tag: &str, view: &ElementView) -> bool {
        if !self.options.include_hidden && is_hidden(node.style(), &view.attributes) {
            return false;
        }
        let ancestors = self.ancestors.as_slice();
        if self.filters.exclude.iter().any(|s| s.matches(view, ancestors)) {
            return false;
        }
        if !self.filters.include_only.is_empty()
            && !self.filters.include_only.iter().any(|s| s.matches(view, ancestors))
        {
            return false;
        }
        if let Some(css) = &self.filters.css {
            if !css.matches(view, ancestors) {
                return false;
            }
        }
        if self.options.only_form_elements && !tag_traits(tag).form_element {
            return false;
        }
        true
    }

    fn traits_for(&mut self, tag: &str, view_id: &str, view_class: &str) -> TagTraits {
        if !self.options.extraction_cache {
            return tag_traits(tag);
        }
        let key = format!("{tag}|{view_id}|{view_class}|{}", self.config_hash);
        if let Some(traits) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return *traits;
        }
        let traits = tag_traits(tag);
        self.cache.insert(key, traits);
        traits
    }

    fn build_record<N: DomSource>(
        &mut self,
        node: &N,
        tag: &str,
        raw: &[(String, String)],
        location: &Location,
        parent: Option<usize>,
        index: usize,
    ) -> ElementRecord {
        let attributes = prepare_attributes(raw, self.options);
        let id = attributes.get("id").cloned().unwrap_or_default();
        let class = attributes.get("class").cloned().unwrap_or_default();
        let traits = self.traits_for(tag, &id, &class);

        let state = resolve_state(tag, &attributes, node.form_state());
        let text_content = if self.options.include_text {
            let budget = TextBudget::new(
                self.options.max_text_length,
                self.options.max_depth.saturating_sub(location.depth),
                self.max_elements,
            );
            extract_text(node, tag, &attributes, state.as_ref(), budget)
        } else {
            None
        };

        let rect = node.rect();
        let is_visible = !is_hidden(node.style(), &attributes) && rect.is_none_or(|r| r.has_area());
        let is_in_viewport = is_visible
            && match (rect, self.options.viewport) {
                (Some(r), Some(v)) => r.intersects(&v),
                _ => false,
            };

        ElementRecord {
            index,
            parent,
            tag_name: tag.to_string(),
            selector: build_selector(tag, &attributes, location.nth_of_type),
            content_hash: content_hash(tag, &attributes, text_content.as_deref()),
            classification: Classification {
                is_interactive: is_interactive(tag, &attributes, traits),
                is_form_element: traits.form_element,
                is_visible,
                is_in_viewport,
            },
            position: Position {
                depth: location.depth,
                sibling_index: location.sibling_index,
                sibling_count: location.sibling_count,
                child_count: node.children().len(),
            },
            xpath: location.path.clone(),
            attributes,
            text_content,
            rect,
            state,
        }
    }
}
