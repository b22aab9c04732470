pub mod extract;
pub mod format;
pub mod snapshot_model;
pub mod snapshotter;

pub use snapshot_model::{ElementRecord, Snapshot, SnapshotOptions, SnapshotTree};
pub use snapshotter::ElementSnapshotter;
