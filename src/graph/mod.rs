pub mod builder;
pub mod cycles;
pub mod graph_model;

pub use builder::DependencyGraphBuilder;
pub use cycles::detect_cycles;
pub use graph_model::{DependencyEdge, DependencyGraph, EdgeType, GraphOptions, Strength};
