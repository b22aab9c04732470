use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::config::DEFAULT_MIN_PATTERN_OCCURRENCES;
use crate::pattern::catalog::default_catalog;

/// A named UI pattern described by CSS selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub selectors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternOptions {
    /// Replaces the built-in catalog when set.
    pub library: Option<Vec<PatternDefinition>>,
    pub min_occurrences: usize,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            library: None,
            min_occurrences: DEFAULT_MIN_PATTERN_OCCURRENCES,
        }
    }
}

impl PatternOptions {
    pub fn definitions(&self) -> Vec<PatternDefinition> {
        self.library.clone().unwrap_or_else(default_catalog)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSource {
    Library,
    Structural,
    Text,
    Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub name: String,
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub source: PatternSource,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub occurrences: usize,
    pub matched_selectors: Vec<String>,
    /// Structural paths of the matched elements.
    pub matched_elements: Vec<String>,
    pub recommendations: Vec<String>,
}

// ============================================================================
// Libraries on disk
// ============================================================================

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read pattern library '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern library: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A set of pattern definitions, loadable from YAML:
///
/// ```yaml
/// patterns:
///   - name: cookie_banner
///     type: overlay
///     selectors: ["#cookie-consent", ".cookie-banner"]
///     recommendations: ["Dismiss before interacting with the page"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternLibrary {
    pub patterns: Vec<PatternDefinition>,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self {
            patterns: default_catalog(),
        }
    }
}

impl PatternLibrary {
    pub fn from_yaml(content: &str) -> Result<Self, LibraryError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}
