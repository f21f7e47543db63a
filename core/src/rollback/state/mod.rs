//! Rollback state management
//!
//! Provides the snapshot type and the bounded store that retains one
//! snapshot per frame of the rollback window.

mod snapshot;
mod store;

// Re-export public types
pub use snapshot::Snapshot;
pub use store::SnapshotStore;
