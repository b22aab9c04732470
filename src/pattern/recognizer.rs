use tracing::{debug, warn};

use crate::dom::index::DocumentIndex;
use crate::dom::selector::SelectorList;
use crate::error::{Warning, WarningKind};
use crate::pattern::pattern_model::{PatternDefinition, PatternMatch, PatternOptions, PatternSource};
use crate::pattern::signatures::detect_signature_patterns;
use crate::snapshot::snapshot_model::Snapshot;

/// Patterns found in one pass, plus the selectors that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    pub matches: Vec<PatternMatch>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Default)]
pub struct PatternRecognizer;

impl PatternRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Library patterns first, then signature clusters.
    pub fn recognize(&self, snapshot: &Snapshot, index: &DocumentIndex, options: &PatternOptions) -> Recognition {
        let mut recognition = match_library(index, &options.definitions());
        recognition
            .matches
            .extend(detect_signature_patterns(snapshot, options.min_occurrences));

        debug!(
            patterns = recognition.matches.len(),
            skipped_selectors = recognition.warnings.len(),
            "pattern recognition complete"
        );
        recognition
    }
}

/// Test every definition's selectors against the live document.
///
/// Confidence is the share of valid selectors that matched anything. A
/// selector that fails to parse is left out of the share; a definition with
/// no matching selector is left out of the result.
pub fn match_library(index: &DocumentIndex, definitions: &[PatternDefinition]) -> Recognition {
    let mut recognition = Recognition::default();

    for def in definitions {
        let mut valid = 0usize;
        let mut matched_selectors = Vec::new();
        let mut matched_elements: Vec<String> = Vec::new();

        for source in &def.selectors {
            let selector = match SelectorList::parse(source) {
                Ok(s) => s,
                Err(e) => {
                    warn!(pattern = %def.name, error = %e, "skipping pattern selector");
                    recognition.warnings.push(Warning::new(
                        WarningKind::Configuration,
                        format!("pattern '{}': {e}", def.name),
                    ));
                    continue;
                }
            };
            valid += 1;

            let hits = index.query(&selector);
            if hits.is_empty() {
                continue;
            }
            matched_selectors.push(source.clone());
            for path in hits {
                if !matched_elements.contains(&path) {
                    matched_elements.push(path);
                }
            }
        }

        if matched_selectors.is_empty() || valid == 0 {
            continue;
        }

        let confidence = (matched_selectors.len() as f64 / valid as f64).min(1.0);
        recognition.matches.push(PatternMatch {
            name: def.name.clone(),
            pattern_type: def.pattern_type.clone(),
            source: PatternSource::Library,
            confidence,
            occurrences: matched_elements.len(),
            matched_selectors,
            matched_elements,
            recommendations: def.recommendations.clone(),
        });
    }

    recognition
}
