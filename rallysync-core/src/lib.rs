//! rallysync core library: domain types, sheet documents, configuration, errors.
//!
//! - [`types`]: records, snapshots, changes and row statuses
//! - [`sheet`]: the [`Sheet`] seam and its YAML-backed document
//! - [`config`]: `~/.rallysync/config.yaml`
//! - [`error`]: [`SheetError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod sheet;
pub mod types;

pub use config::SyncConfig;
pub use error::{ConfigError, SheetError};
pub use sheet::{RawRow, Sheet, SheetDocument, SheetRow};
pub use types::{
    Change, ChangeKind, EventFields, Field, FieldDelta, Record, RemoteId, RowPosition, RowStatus,
    Snapshot, SyncState, UniqueId,
};
