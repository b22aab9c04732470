pub mod config;
pub mod extraction;
pub mod orchestrator;
pub mod result;

pub use config::AnalysisConfig;
pub use orchestrator::{AnalysisOrchestrator, DiffStage, FlowControl, FlowState, GraphStage, PatternStage};
pub use result::AnalysisResult;
