pub mod diff_model;
pub mod engine;

pub use diff_model::{ChangeType, DiffOptions, DiffResult, Significance};
pub use engine::{DiffEngine, compare};
