//! Error types for rallysync-sync.

use std::path::PathBuf;

use thiserror::Error;

use rallysync_core::{ConfigError, SheetError};

use crate::remote::RemoteError;

/// All errors that can arise from a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The sheet could not be read or written.
    #[error("sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (snapshot store).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The combined change request failed; the baseline was left untouched.
    #[error("delivery of {records} change(s) failed: {source}")]
    Delivery {
        records: usize,
        #[source]
        source: RemoteError,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
