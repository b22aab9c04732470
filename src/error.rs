use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trace::trace::now_ms;

// ============================================================================
// Error taxonomy
// ============================================================================

/// A single element could not be read. Recovered by omitting the element.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to extract <{tag}> at {path}: {reason}")]
pub struct ExtractionError {
    pub tag: String,
    pub path: String,
    pub reason: String,
}

impl ExtractionError {
    pub fn new(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            path: String::new(),
            reason: reason.into(),
        }
    }

    pub fn at(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

/// A selector string could not be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },

    #[error("unsupported selector syntax '{syntax}' in '{selector}'")]
    Unsupported { selector: String, syntax: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("analysis canceled")]
    Canceled,
}

impl AnalysisError {
    pub fn stage(stage: impl Into<String>, message: impl ToString) -> Self {
        AnalysisError::Stage {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        AnalysisError::Fatal(message.into())
    }
}

impl From<SelectorError> for AnalysisError {
    fn from(err: SelectorError) -> Self {
        AnalysisError::Configuration(err.to_string())
    }
}

// ============================================================================
// Non-fatal warnings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    Stage,
    Configuration,
    Extraction,
    Timeout,
    Truncated,
}

/// A recoverable problem surfaced to the caller alongside a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub timestamp: u128,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: now_ms(),
        }
    }

    /// Classify an analysis error into the warning it degrades to.
    pub fn from_error(err: &AnalysisError) -> Self {
        let kind = match err {
            AnalysisError::Extraction(_) => WarningKind::Extraction,
            AnalysisError::Configuration(_) => WarningKind::Configuration,
            _ => WarningKind::Stage,
        };
        Warning::new(kind, err.to_string())
    }
}
