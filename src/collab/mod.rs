pub mod delivery;
pub mod store;
pub mod transport;

pub use delivery::{DeliverySink, DiffTelemetry, HttpDelivery, MemoryDelivery};
pub use store::{FileResultStore, MemoryResultStore, ResultStore, StoreError};
pub use transport::{Action, AnalysisRequest, AnalysisResponse, OrchestratorFactory, RequestHandler};
