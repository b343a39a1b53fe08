//! Status recorder: per-row sync feedback written back onto the sheet.
//!
//! Sheet write failures are logged and swallowed: status columns are
//! feedback, and a cycle should not stop because one of them could not be
//! written.

use std::collections::BTreeMap;

use rallysync_core::{RemoteId, RowPosition, RowStatus, Sheet, SyncState};

/// Writes status/message pairs and identity bindings through a [`Sheet`],
/// remembering the last status written per row.
pub struct StatusRecorder<'a> {
    sheet: &'a mut dyn Sheet,
    last: BTreeMap<RowPosition, RowStatus>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(sheet: &'a mut dyn Sheet) -> Self {
        Self {
            sheet,
            last: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, position: RowPosition, status: RowStatus) {
        if let Err(err) = self.sheet.write_status(position, &status) {
            tracing::warn!("could not write status for {position}: {err}");
        }
        self.last.insert(position, status);
    }

    /// Blank the status of every row about to be reprocessed.
    pub fn clear<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = RowPosition>,
    {
        for position in positions {
            self.record(position, RowStatus::cleared());
        }
    }

    /// Mark rows as in flight before a remote call touches them.
    pub fn syncing<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = RowPosition>,
    {
        for position in positions {
            self.record(position, RowStatus::syncing());
        }
    }

    pub fn success(&mut self, position: RowPosition, message: impl Into<String>) {
        self.record(position, RowStatus::success(message));
    }

    pub fn error(&mut self, position: RowPosition, message: impl Into<String>) {
        self.record(position, RowStatus::error(message));
    }

    /// Bind a freshly created identity onto its row.
    pub fn bind(&mut self, position: RowPosition, remote_id: &RemoteId) {
        if let Err(err) = self.sheet.write_remote_id(position, Some(remote_id)) {
            tracing::error!("could not write remote id {remote_id} to {position}: {err}");
        }
    }

    /// Remove the identity from a row whose remote record is gone and mark it
    /// deleted.
    pub fn deleted(&mut self, position: RowPosition, message: impl Into<String>) {
        if let Err(err) = self.sheet.write_remote_id(position, None) {
            tracing::warn!("could not clear remote id on {position}: {err}");
        }
        self.record(position, RowStatus::deleted(message));
    }

    pub fn count(&self, state: SyncState) -> usize {
        self.last.values().filter(|s| s.state == state).count()
    }

    /// Final status of every row touched this cycle, in row order.
    pub fn into_outcomes(self) -> BTreeMap<RowPosition, RowStatus> {
        self.last
    }
}
