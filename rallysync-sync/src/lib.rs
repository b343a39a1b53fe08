//! # rallysync-sync
//!
//! Sheet ↔ remote reconciliation.
//!
//! Call [`pipeline::run`] to sync one sheet file, or drive a [`SyncEngine`]
//! directly with any [`RemoteApi`] and [`SnapshotStore`].

pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod extract;
pub mod orphans;
pub mod pipeline;
pub mod provision;
pub mod remote;
pub mod snapshot_store;
pub mod status;

#[cfg(test)]
mod test_support;

pub use engine::{ChangeCounts, CycleReport, Preview, SyncEngine, SyncOptions};
pub use error::SyncError;
pub use pipeline::RunOutcome;
pub use remote::{HttpRemote, RemoteApi, RemoteError};
pub use snapshot_store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
