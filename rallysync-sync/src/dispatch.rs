//! Reconciliation dispatch: deliver detected changes to the remote store.
//!
//! 1. Changes whose subject has no remote identity are dropped.
//! 2. More than one deletion → one `BATCH_DELETE_HUBDB_ROWS` call. If the
//!    batch as a whole fails, every deletion falls back into step 3.
//!    A single deletion goes straight to step 3.
//! 3. Everything else goes out as one combined request. Its failure is the
//!    one fatal outcome of a cycle.
//!
//! Rows are marked `syncing` before each remote call that touches them.

use std::collections::HashMap;

use rallysync_core::{Change, ChangeKind, RemoteId, RowPosition, UniqueId};

use crate::engine::SyncOptions;
use crate::error::SyncError;
use crate::remote::{
    BatchDeleteRequest, ChangeBatchRequest, ChangeRecord, RemoteApi, RequestMetadata,
};
use crate::status::StatusRecorder;

/// What happened to the changes handed to [`dispatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Dropped because there was no remote identity to act on.
    pub skipped: Vec<UniqueId>,
    pub batch_attempted: bool,
    /// The batch delete failed and its deletions were sent individually.
    pub batch_fallback: bool,
    /// Confirmed deleted by the batch call.
    pub deleted: Vec<RemoteId>,
    /// Reported as not deleted by an otherwise successful batch call.
    pub delete_failures: Vec<RemoteId>,
    /// Delivered through the combined request.
    pub sent: Vec<UniqueId>,
    /// Response body of the combined request.
    pub response: Option<serde_json::Value>,
}

fn rows(changes: &[Change]) -> Vec<RowPosition> {
    changes.iter().filter_map(Change::status_row).collect()
}

/// Deliver `changes`; see the module docs for the order of operations.
pub fn dispatch(
    changes: Vec<Change>,
    remote: &dyn RemoteApi,
    recorder: &mut StatusRecorder<'_>,
    options: &SyncOptions,
) -> Result<DispatchReport, SyncError> {
    let mut report = DispatchReport::default();

    let (deliverable, skipped): (Vec<Change>, Vec<Change>) =
        changes.into_iter().partition(|c| c.remote_id().is_some());
    for change in &skipped {
        tracing::debug!(
            "{} {}: no remote identity, nothing to sync",
            change.kind(),
            change.unique_id()
        );
        report.skipped.push(change.unique_id().clone());
    }

    let (deletes, mut others): (Vec<Change>, Vec<Change>) = deliverable
        .into_iter()
        .partition(|c| c.kind() == ChangeKind::Deleted);

    match deletes.len() {
        0 => {}
        1 => others.extend(deletes),
        _ => {
            report.batch_attempted = true;
            if !batch_delete(&deletes, remote, recorder, options, &mut report) {
                report.batch_fallback = true;
                others.extend(deletes);
            }
        }
    }

    if others.is_empty() {
        return Ok(report);
    }

    recorder.syncing(rows(&others));
    let request = ChangeBatchRequest {
        records: others
            .iter()
            .map(|c| ChangeRecord::from_change(c, &options.source))
            .collect(),
    };

    match remote.send_changes(&request) {
        Ok(response) => {
            tracing::info!("delivered {} change(s)", others.len());
            for change in &others {
                match (change.kind(), change.status_row()) {
                    (ChangeKind::Deleted, Some(row)) => recorder.deleted(row, "deleted remotely"),
                    (_, Some(row)) => recorder.success(row, format!("{} synced", change.kind())),
                    (_, None) => {}
                }
                report.sent.push(change.unique_id().clone());
            }
            report.response = Some(response);
            Ok(report)
        }
        Err(error) => {
            tracing::error!("delivery of {} change(s) failed: {error}", others.len());
            for change in &others {
                if let Some(row) = change.status_row() {
                    recorder.error(row, format!("{} failed: {error}", change.kind()));
                }
            }
            Err(SyncError::Delivery {
                records: others.len(),
                source: error,
            })
        }
    }
}

/// Returns `false` when the batch as a whole failed and its deletions must be
/// retried individually.
fn batch_delete(
    deletes: &[Change],
    remote: &dyn RemoteApi,
    recorder: &mut StatusRecorder<'_>,
    options: &SyncOptions,
    report: &mut DispatchReport,
) -> bool {
    recorder.syncing(rows(deletes));
    let request = BatchDeleteRequest {
        remote_ids: deletes.iter().filter_map(|c| c.remote_id().cloned()).collect(),
        metadata: RequestMetadata::now(&options.source, None),
    };
    let result = remote
        .batch_delete(&request)
        .and_then(|response| response.into_outcomes());
    options.pause();

    let outcomes = match result {
        Ok(outcomes) => outcomes,
        Err(error) => {
            tracing::warn!(
                "batch delete of {} row(s) failed, falling back: {error}",
                deletes.len()
            );
            for row in rows(deletes) {
                recorder.error(row, format!("batch delete failed: {error}"));
            }
            return false;
        }
    };

    let succeeded: HashMap<&str, bool> = outcomes
        .iter()
        .map(|o| (o.remote_id.as_str(), o.succeeded()))
        .collect();

    for change in deletes {
        let Some(remote_id) = change.remote_id() else {
            continue;
        };
        match succeeded.get(remote_id.0.as_str()) {
            Some(true) => {
                if let Some(row) = change.status_row() {
                    recorder.deleted(row, "deleted remotely");
                }
                report.deleted.push(remote_id.clone());
            }
            other => {
                let detail = if other.is_some() {
                    "remote reported failure"
                } else {
                    "missing from batch results"
                };
                tracing::warn!("batch delete of {remote_id}: {detail}");
                if let Some(row) = change.status_row() {
                    recorder.error(row, format!("delete failed: {detail}"));
                }
                report.delete_failures.push(remote_id.clone());
            }
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
