//! Snapshot, diff, dependency-graph and pattern analysis over page DOM dumps.
//!
//! The entry point is [`analysis::AnalysisOrchestrator`]; every stage is also
//! usable on its own.

pub mod analysis;
pub mod cli;
pub mod collab;
pub mod diff;
pub mod dom;
pub mod error;
pub mod graph;
pub mod identity;
pub mod pattern;
pub mod snapshot;
pub mod trace;

pub use analysis::{AnalysisConfig, AnalysisOrchestrator, AnalysisResult};
pub use dom::dom_model::{DomNode, DomPage, DomSource, PageInfo};
pub use error::{AnalysisError, Warning, WarningKind};
