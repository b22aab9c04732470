use std::collections::HashMap;

use tracing::debug;

use crate::diff::diff_model::{
    ChangeRecord, ChangeSet, ChangeType, DiffOptions, DiffResult, ElementRef, Modification,
    ModificationKind, Significance,
};
use crate::identity::keys::{ElementKey, is_stable_id, keys_for, normalize_whitespace};
use crate::identity::similarity::similarity;
use crate::snapshot::snapshot_model::{ElementRecord, ElementState, Snapshot};

/// Attributes whose change means the user-visible value changed.
const VALUE_ATTRIBUTES: [&str; 3] = ["value", "checked", "selected"];
const PRESENTATION_ATTRIBUTES: [&str; 2] = ["class", "style"];
const KEY_RANKS: usize = 3;

// ============================================================================
// Stateful engine
// ============================================================================

/// Diffs each snapshot against the one before it.
///
/// Holds a single baseline: every call to [`DiffEngine::diff`] replaces it.
/// Calls must be serialized by the caller.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    baseline: Option<Snapshot>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff(&mut self, current: &Snapshot, options: &DiffOptions) -> DiffResult {
        match self.baseline.replace(current.clone()) {
            None => {
                debug!(elements = current.len(), "diff baseline stored");
                DiffResult::baseline()
            }
            Some(previous) => compare(&previous, current, options),
        }
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<&Snapshot> {
        self.baseline.as_ref()
    }
}

// ============================================================================
// Pure comparison
// ============================================================================

/// Compare two snapshots without touching any baseline.
pub fn compare(previous: &Snapshot, current: &Snapshot, options: &DiffOptions) -> DiffResult {
    let pairs = match_elements(&previous.flat, &current.flat, options.similarity_threshold);

    let mut changes = ChangeSet::default();
    let mut prev_matched = vec![false; previous.flat.len()];

    for (cur_idx, pair) in pairs.iter().enumerate() {
        let cur = &current.flat[cur_idx];
        let Some(m) = pair else {
            changes.added.push(record_change(cur, ChangeType::Added, None, vec![]));
            continue;
        };
        prev_matched[m.previous] = true;

        let prev = &previous.flat[m.previous];
        let modifications = detect_modifications(prev, cur, options);

        if m.rank > 0 && prev.xpath != cur.xpath {
            changes.moved.push(record_change(
                cur,
                ChangeType::Moved,
                Some(prev.xpath.clone()),
                modifications,
            ));
        } else if !modifications.is_empty() {
            changes
                .modified
                .push(record_change(cur, ChangeType::Modified, None, modifications));
        }
    }

    for (prev_idx, matched) in prev_matched.iter().enumerate() {
        if !matched {
            let prev = &previous.flat[prev_idx];
            changes
                .removed
                .push(record_change(prev, ChangeType::Removed, None, vec![]));
        }
    }

    let result = DiffResult::from_changes(changes, current.len());
    debug!(
        added = result.summary.added,
        removed = result.summary.removed,
        modified = result.summary.modified,
        moved = result.summary.moved,
        significant = result.summary.significant,
        "diff computed"
    );
    result
}

// ============================================================================
// Matching
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Match {
    previous: usize,
    rank: usize,
}

/// Pair every current element with at most one previous element.
///
/// Runs one pass per key rank so that a path match anywhere in the document
/// is settled before any weaker key is consulted.
fn match_elements(
    previous: &[ElementRecord],
    current: &[ElementRecord],
    threshold: f64,
) -> Vec<Option<Match>> {
    let mut index: HashMap<ElementKey, Vec<usize>> = HashMap::new();
    for (i, record) in previous.iter().enumerate() {
        for key in keys_for(record) {
            index.entry(key).or_default().push(i);
        }
    }

    let current_keys: Vec<Vec<ElementKey>> = current.iter().map(keys_for).collect();
    let mut taken = vec![false; previous.len()];
    let mut pairs: Vec<Option<Match>> = vec![None; current.len()];

    for rank in 0..KEY_RANKS {
        for (cur_idx, keys) in current_keys.iter().enumerate() {
            if pairs[cur_idx].is_some() {
                continue;
            }
            let Some(key) = keys.iter().find(|k| k.rank() == rank) else {
                continue;
            };
            let Some(bucket) = index.get(key) else {
                continue;
            };

            let cur = &current[cur_idx];
            let candidates: Vec<usize> = bucket
                .iter()
                .copied()
                .filter(|&p| !taken[p] && compatible(&previous[p], cur, rank))
                .collect();

            if let Some(p) = pick(&candidates, previous, cur, threshold) {
                taken[p] = true;
                pairs[cur_idx] = Some(Match { previous: p, rank });
            }
        }
    }

    pairs
}

fn compatible(prev: &ElementRecord, cur: &ElementRecord, rank: usize) -> bool {
    if prev.tag_name != cur.tag_name {
        return false;
    }
    // Same slot, different element.
    if rank == 0 {
        if let (Some(a), Some(b)) = (prev.id(), cur.id()) {
            if is_stable_id(a) && is_stable_id(b) && a != b {
                return false;
            }
        }
    }
    true
}

/// A lone candidate is accepted outright. Several are scored; the highest at
/// or above `threshold` wins and ties go to the earliest in document order.
fn pick(
    candidates: &[usize],
    previous: &[ElementRecord],
    cur: &ElementRecord,
    threshold: f64,
) -> Option<usize> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut best: Option<(usize, f64)> = None;
            for &p in candidates {
                let score = similarity(&previous[p], cur);
                if score < threshold {
                    continue;
                }
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((p, score));
                }
            }
            best.map(|(p, _)| p)
        }
    }
}

// ============================================================================
// Modifications and significance
// ============================================================================

fn detect_modifications(
    prev: &ElementRecord,
    cur: &ElementRecord,
    options: &DiffOptions,
) -> Vec<Modification> {
    let ignored = |name: &str| options.ignore_attributes.iter().any(|a| a == name);
    let mut mods = Vec::new();

    for (name, old) in &prev.attributes {
        if ignored(name) {
            continue;
        }
        match cur.attributes.get(name) {
            Some(new) if new == old => {}
            new => mods.push(Modification {
                kind: ModificationKind::Attribute,
                key: name.clone(),
                old_value: Some(old.clone()),
                new_value: new.cloned(),
            }),
        }
    }
    for (name, new) in &cur.attributes {
        if !ignored(name) && !prev.attributes.contains_key(name) {
            mods.push(Modification {
                kind: ModificationKind::Attribute,
                key: name.clone(),
                old_value: None,
                new_value: Some(new.clone()),
            });
        }
    }

    let text = |t: &Option<String>| {
        t.as_deref().map(|t| {
            if options.ignore_whitespace {
                normalize_whitespace(t)
            } else {
                t.to_string()
            }
        })
    };
    let (old_text, new_text) = (text(&prev.text_content), text(&cur.text_content));
    if old_text != new_text {
        mods.push(Modification {
            kind: ModificationKind::Text,
            key: "textContent".into(),
            old_value: old_text,
            new_value: new_text,
        });
    }

    mods.extend(state_changes(prev.state.as_ref(), cur.state.as_ref()));
    mods
}

fn state_changes(prev: Option<&ElementState>, cur: Option<&ElementState>) -> Vec<Modification> {
    let value = |s: Option<&ElementState>| s.and_then(|s| s.value.clone());
    let checked = |s: Option<&ElementState>| s.and_then(|s| s.checked).map(|b| b.to_string());
    let selected = |s: Option<&ElementState>| s.and_then(|s| s.selected).map(|b| b.to_string());

    [
        ("value", value(prev), value(cur)),
        ("checked", checked(prev), checked(cur)),
        ("selected", selected(prev), selected(cur)),
    ]
    .into_iter()
    .filter(|(_, old, new)| old != new)
    .map(|(key, old, new)| Modification {
        kind: ModificationKind::State,
        key: key.into(),
        old_value: old,
        new_value: new,
    })
    .collect()
}

pub fn significance(
    record: &ElementRecord,
    change_type: ChangeType,
    modifications: &[Modification],
) -> Significance {
    let interactive =
        record.classification.is_interactive || record.classification.is_form_element;
    let value_changed = modifications.iter().any(|m| {
        m.kind == ModificationKind::State
            || (m.kind == ModificationKind::Attribute && VALUE_ATTRIBUTES.contains(&m.key.as_str()))
    });

    if interactive
        && (matches!(change_type, ChangeType::Added | ChangeType::Removed) || value_changed)
    {
        return Significance::High;
    }
    if modifications.iter().any(|m| {
        m.kind == ModificationKind::Attribute && PRESENTATION_ATTRIBUTES.contains(&m.key.as_str())
    }) {
        return Significance::Medium;
    }
    Significance::Low
}

fn record_change(
    record: &ElementRecord,
    change_type: ChangeType,
    previous_path: Option<String>,
    modifications: Vec<Modification>,
) -> ChangeRecord {
    ChangeRecord {
        change_type,
        path: record.xpath.clone(),
        previous_path,
        element: ElementRef::from(record),
        significance: significance(record, change_type, &modifications),
        modifications,
    }
}
