pub mod catalog;
pub mod pattern_model;
pub mod recognizer;
pub mod signatures;

pub use pattern_model::{PatternDefinition, PatternLibrary, PatternMatch, PatternOptions, PatternSource};
pub use recognizer::{PatternRecognizer, Recognition, match_library};
