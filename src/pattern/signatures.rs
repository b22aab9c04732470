use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identity::similarity::{jaccard, ratio};
use crate::pattern::pattern_model::{PatternMatch, PatternSource};
use crate::snapshot::snapshot_model::{ElementRecord, Snapshot};

/// Pairwise scoring looks at no more than this many members of a cluster.
pub const MAX_SCORED_MEMBERS: usize = 50;

const TAG_WEIGHT: f64 = 0.3;
const CLASS_WEIGHT: f64 = 0.2;
const STRUCTURE_WEIGHT: f64 = 0.3;
const TYPE_WEIGHT: f64 = 0.2;

/// Rect dimensions are bucketed to this many pixels.
const SIZE_BUCKET_PX: f64 = 50.0;

// ============================================================================
// Text shapes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextShape {
    Email,
    Phone,
    Date,
    Url,
    Currency,
    Label,
    Paragraph,
}

impl TextShape {
    pub fn as_str(self) -> &'static str {
        match self {
            TextShape::Email => "email",
            TextShape::Phone => "phone",
            TextShape::Date => "date",
            TextShape::Url => "url",
            TextShape::Currency => "currency",
            TextShape::Label => "label",
            TextShape::Paragraph => "paragraph",
        }
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").expect("email pattern")
});

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:https?://|www\.)\S+$").expect("url pattern"));

static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:[$€£¥₹]\s?\d{1,3}(?:,?\d{3})*(?:\.\d{1,2})?|\d{1,3}(?:,?\d{3})*(?:\.\d{1,2})?\s?[$€£¥₹])$")
        .expect("currency pattern")
});

/// `2024-01-31`, `31/01/2024`, `1.2.2024`.
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4})$").expect("date pattern")
});

/// Needs a country prefix, an area code in parentheses or separated digit
/// groups; a bare run of digits is a number, not a phone.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+\d{1,3}[ .-]?)?(?:\(\d{2,4}\)[ .-]?|\d{2,4}[ .-])(?:\d{2,4}[ .-]){0,2}\d{3,4}$")
        .expect("phone pattern")
});

/// Classify a text by its shape. `None` for text that fits no shape.
pub fn text_shape(text: &str) -> Option<TextShape> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if EMAIL.is_match(text) {
        Some(TextShape::Email)
    } else if URL.is_match(text) {
        Some(TextShape::Url)
    } else if CURRENCY.is_match(text) {
        Some(TextShape::Currency)
    } else if DATE.is_match(text) {
        Some(TextShape::Date)
    } else if PHONE.is_match(text) {
        Some(TextShape::Phone)
    } else if text.chars().count() > 80 || text.split_whitespace().count() >= 12 {
        Some(TextShape::Paragraph)
    } else if text.ends_with(':') || (text.chars().count() <= 30 && text.split_whitespace().count() <= 4) {
        Some(TextShape::Label)
    } else {
        None
    }
}

// ============================================================================
// Signatures
// ============================================================================

fn class_key(record: &ElementRecord) -> String {
    let mut classes = record.classes();
    classes.sort_unstable();
    classes.dedup();
    classes.join(".")
}

fn structural_signature(record: &ElementRecord, child_tags: &[&str]) -> Option<String> {
    let classes = class_key(record);
    if classes.is_empty() && child_tags.is_empty() {
        return None;
    }
    Some(format!("{}.{classes}>{}", record.tag_name, child_tags.join(",")))
}

fn text_signature(record: &ElementRecord) -> Option<(String, TextShape)> {
    let shape = text_shape(record.text_content.as_deref()?)?;
    Some((format!("{}:{}", record.tag_name, shape.as_str()), shape))
}

fn style_signature(record: &ElementRecord) -> Option<String> {
    let rect = record.rect.filter(|r| r.has_area())?;
    let bucket = |v: f64| (v / SIZE_BUCKET_PX).round() as i64;
    Some(format!(
        "{}.{}@{}x{}",
        record.tag_name,
        class_key(record),
        bucket(rect.width),
        bucket(rect.height)
    ))
}

// ============================================================================
// Clustering
// ============================================================================

struct Cluster {
    source: PatternSource,
    signature: String,
    pattern_type: String,
    members: Vec<usize>,
}

/// Group the snapshot's elements by structural, text and style signature and
/// report every group with at least `min_occurrences` members.
pub fn detect_signature_patterns(snapshot: &Snapshot, min_occurrences: usize) -> Vec<PatternMatch> {
    let child_tags = snapshot.child_tags();
    let mut groups: BTreeMap<(u8, String), Cluster> = BTreeMap::new();

    let mut add = |source: PatternSource, order: u8, signature: String, pattern_type: &str, i: usize| {
        groups
            .entry((order, signature.clone()))
            .or_insert_with(|| Cluster {
                source,
                signature,
                pattern_type: pattern_type.to_string(),
                members: Vec::new(),
            })
            .members
            .push(i);
    };

    for (i, record) in snapshot.flat.iter().enumerate() {
        if let Some(sig) = structural_signature(record, &child_tags[i]) {
            add(PatternSource::Structural, 0, sig, "repeated-structure", i);
        }
        if let Some((sig, shape)) = text_signature(record) {
            add(PatternSource::Text, 1, sig, &format!("text-{}", shape.as_str()), i);
        }
        if let Some(sig) = style_signature(record) {
            add(PatternSource::Style, 2, sig, "style-group", i);
        }
    }

    groups
        .into_values()
        .filter(|c| c.members.len() >= min_occurrences.max(2))
        .map(|c| to_match(snapshot, &child_tags, c))
        .collect()
}

fn to_match(snapshot: &Snapshot, child_tags: &[Vec<&str>], cluster: Cluster) -> PatternMatch {
    let members: Vec<&ElementRecord> = cluster.members.iter().map(|&i| &snapshot.flat[i]).collect();
    let scored: Vec<(usize, &ElementRecord)> = cluster
        .members
        .iter()
        .take(MAX_SCORED_MEMBERS)
        .map(|&i| (i, &snapshot.flat[i]))
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (a_pos, (ai, a)) in scored.iter().enumerate() {
        for (bi, b) in &scored[a_pos + 1..] {
            total += pair_similarity(cluster.source, a, b, &child_tags[*ai], &child_tags[*bi]);
            pairs += 1;
        }
    }
    let confidence = if pairs == 0 { 0.0 } else { (total / pairs as f64).clamp(0.0, 1.0) };

    PatternMatch {
        name: format!("{}:{}", source_name(cluster.source), cluster.signature),
        pattern_type: cluster.pattern_type,
        source: cluster.source,
        confidence,
        occurrences: members.len(),
        matched_selectors: vec![],
        matched_elements: members.iter().map(|m| m.xpath.clone()).collect(),
        recommendations: recommendations(cluster.source),
    }
}

fn source_name(source: PatternSource) -> &'static str {
    match source {
        PatternSource::Library => "library",
        PatternSource::Structural => "structural",
        PatternSource::Text => "text",
        PatternSource::Style => "style",
    }
}

fn recommendations(source: PatternSource) -> Vec<String> {
    let text = match source {
        PatternSource::Structural => "Repeated structure: use one parameterized locator for all items",
        PatternSource::Text => "Consistent text format: validate it with a single format assertion",
        PatternSource::Style => "Visually uniform group: check layout with one shared expectation",
        PatternSource::Library => return vec![],
    };
    vec![text.to_string()]
}

/// Weighted similarity of two cluster members: tag, class set, structure and
/// a component that depends on how the cluster was formed.
pub fn pair_similarity(
    source: PatternSource,
    a: &ElementRecord,
    b: &ElementRecord,
    a_children: &[&str],
    b_children: &[&str],
) -> f64 {
    let tag = if a.tag_name == b.tag_name { 1.0 } else { 0.0 };
    let class = jaccard(&a.classes(), &b.classes());
    let structure = jaccard(a_children, b_children) * 0.5
        + ratio(a.position.depth as f64, b.position.depth as f64) * 0.5;

    let specific = match source {
        PatternSource::Text => {
            let len = |r: &ElementRecord| r.text_content.as_deref().map_or(0, |t| t.chars().count()) as f64;
            ratio(len(a), len(b))
        }
        PatternSource::Style => {
            let area = |r: &ElementRecord| r.rect.map_or(0.0, |r| r.width * r.height);
            ratio(area(a), area(b))
        }
        _ => ratio(a.position.child_count as f64, b.position.child_count as f64),
    };

    TAG_WEIGHT * tag + CLASS_WEIGHT * class + STRUCTURE_WEIGHT * structure + TYPE_WEIGHT * specific
}
