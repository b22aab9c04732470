use std::collections::HashSet;
use std::hash::Hash;

use crate::snapshot::snapshot_model::ElementRecord;

/// Weights of the cross-snapshot match score. Hand-tuned.
pub const PATH_WEIGHT: f64 = 5.0;
pub const ID_WEIGHT: f64 = 3.0;
pub const TAG_WEIGHT: f64 = 2.0;
pub const CLASS_WEIGHT: f64 = 2.0;
pub const TEXT_WEIGHT: f64 = 1.0;

const TEXT_COMPARE_CHARS: usize = 100;

/// Jaccard index of two sets; two empty sets are identical.
pub fn jaccard<T: Eq + Hash>(a: &[T], b: &[T]) -> f64 {
    let a: HashSet<&T> = a.iter().collect();
    let b: HashSet<&T> = b.iter().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    inter / union
}

/// Edit-distance similarity over the leading characters of both texts.
pub fn text_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    let a: String = a.unwrap_or_default().chars().take(TEXT_COMPARE_CHARS).collect();
    let b: String = b.unwrap_or_default().chars().take(TEXT_COMPARE_CHARS).collect();
    strsim::normalized_levenshtein(&a, &b)
}

/// Normalized similarity in `[0, 1]` between two records from different snapshots.
pub fn similarity(a: &ElementRecord, b: &ElementRecord) -> f64 {
    let mut score = 0.0;

    if a.xpath == b.xpath {
        score += PATH_WEIGHT;
    }
    if a.id() == b.id() {
        score += ID_WEIGHT;
    }
    if a.tag_name == b.tag_name {
        score += TAG_WEIGHT;
    }
    score += CLASS_WEIGHT * jaccard(&a.classes(), &b.classes());
    score += TEXT_WEIGHT * text_similarity(a.text_content.as_deref(), b.text_content.as_deref());

    score / (PATH_WEIGHT + ID_WEIGHT + TAG_WEIGHT + CLASS_WEIGHT + TEXT_WEIGHT)
}

/// Ratio of the smaller to the larger value; two zeros are identical.
pub fn ratio(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max <= 0.0 { 1.0 } else { a.min(b) / max }
}
