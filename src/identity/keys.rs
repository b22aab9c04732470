use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::snapshot::snapshot_model::ElementRecord;

/// Attributes that name an element for tests, in priority order.
pub const TEST_ID_ATTRIBUTES: [&str; 4] = ["data-testid", "data-test", "data-cy", "data-qa"];

const HASH_TEXT_CHARS: usize = 100;
const HASH_ATTRIBUTE_CHARS: usize = 200;
const HASH_HEX_LEN: usize = 16;

// ============================================================================
// Keys
// ============================================================================

/// A candidate identity for an element across snapshots.
///
/// Ordered by reliability: structural path, then stable selector, then
/// content hash. Only the content hash is a weak key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ElementKey {
    Path(String),
    StableSelector(String),
    ContentHash(String),
}

impl ElementKey {
    pub fn rank(&self) -> usize {
        match self {
            ElementKey::Path(_) => 0,
            ElementKey::StableSelector(_) => 1,
            ElementKey::ContentHash(_) => 2,
        }
    }
}

/// What a generated selector is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorBasis {
    TestId,
    StableId,
    Name,
    Role,
    Positional,
}

impl SelectorBasis {
    /// Whether the selector survives sibling insertions.
    pub fn is_stable(self) -> bool {
        matches!(self, SelectorBasis::TestId | SelectorBasis::StableId | SelectorBasis::Name)
    }
}

/// Every identity key of a record, most reliable first.
pub fn keys_for(record: &ElementRecord) -> Vec<ElementKey> {
    let mut keys = vec![ElementKey::Path(record.xpath.clone())];
    if selector_basis(&record.attributes).is_stable() {
        keys.push(ElementKey::StableSelector(record.selector.clone()));
    }
    keys.push(ElementKey::ContentHash(record.content_hash.clone()));
    keys
}

// ============================================================================
// Stable ids and selectors
// ============================================================================

/// Ids ending in a digit are treated as generated (`field-42`).
pub fn is_stable_id(id: &str) -> bool {
    !id.is_empty() && !id.ends_with(|c: char| c.is_ascii_digit())
}

pub fn selector_basis(attributes: &BTreeMap<String, String>) -> SelectorBasis {
    let present = |name: &str| attributes.get(name).is_some_and(|v| !v.is_empty());

    if TEST_ID_ATTRIBUTES.iter().any(|a| present(a)) {
        SelectorBasis::TestId
    } else if attributes.get("id").is_some_and(|id| is_stable_id(id)) {
        SelectorBasis::StableId
    } else if present("name") {
        SelectorBasis::Name
    } else if present("role") {
        SelectorBasis::Role
    } else {
        SelectorBasis::Positional
    }
}

/// Best-effort CSS selector for an element.
///
/// `nth_of_type` is the 1-based position among same-tag siblings and is only
/// used when nothing more stable is available.
pub fn build_selector(tag: &str, attributes: &BTreeMap<String, String>, nth_of_type: usize) -> String {
    let tag = tag.to_ascii_lowercase();
    match selector_basis(attributes) {
        SelectorBasis::TestId => {
            let (name, value) = TEST_ID_ATTRIBUTES
                .iter()
                .find_map(|a| attributes.get(*a).filter(|v| !v.is_empty()).map(|v| (*a, v)))
                .unwrap_or(("data-testid", &tag));
            format!("[{name}=\"{}\"]", escape_value(value))
        }
        SelectorBasis::StableId => {
            let id = attributes.get("id").map(String::as_str).unwrap_or_default();
            if id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                && !id.starts_with(|c: char| c.is_ascii_digit())
            {
                format!("#{id}")
            } else {
                format!("[id=\"{}\"]", escape_value(id))
            }
        }
        SelectorBasis::Name => {
            let name = attributes.get("name").map(String::as_str).unwrap_or_default();
            format!("{tag}[name=\"{}\"]", escape_value(name))
        }
        SelectorBasis::Role => {
            let role = attributes.get("role").map(String::as_str).unwrap_or_default();
            format!("{tag}[role=\"{}\"]", escape_value(role))
        }
        SelectorBasis::Positional => {
            let mut out = tag;
            if let Some(class) = attributes.get("class") {
                for c in class.split_whitespace() {
                    out.push('.');
                    out.push_str(c);
                }
            }
            format!("{out}:nth-of-type({nth_of_type})")
        }
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ============================================================================
// Hashing
// ============================================================================

pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Similarity hint over tag, id, class, leading text and leading attributes.
/// Collisions are acceptable.
pub fn content_hash(tag: &str, attributes: &BTreeMap<String, String>, text: Option<&str>) -> String {
    let id = attributes.get("id").map(String::as_str).unwrap_or_default();
    let class = attributes.get("class").map(String::as_str).unwrap_or_default();
    let text: String = text.unwrap_or_default().chars().take(HASH_TEXT_CHARS).collect();
    let serialized: String = attributes
        .iter()
        .map(|(k, v)| format!("{k}={v};"))
        .collect::<String>()
        .chars()
        .take(HASH_ATTRIBUTE_CHARS)
        .collect();

    let material = format!("{}|{id}|{class}|{text}|{serialized}", tag.to_ascii_lowercase());
    let mut hash = fingerprint(&material);
    hash.truncate(HASH_HEX_LEN);
    hash
}

/// Collapse runs of whitespace and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
