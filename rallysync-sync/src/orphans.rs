//! Orphaned rows: emptied by the user but still bound to a remote record.
//!
//! An orphan whose identity the baseline knows is already covered by a
//! DELETED change; it only needs its row attached so the deletion status
//! lands there. Any other orphan is deleted on its own with
//! `DELETE_HUBDB_ROW`. Each identity is handled once: when several emptied
//! rows carry the same remote id, the first row in sheet order stands for it.

use std::collections::HashSet;

use rallysync_core::{Change, RemoteId, Snapshot, UniqueId};

use crate::engine::SyncOptions;
use crate::extract::Orphan;
use crate::remote::{DeleteRowRequest, RemoteApi, RequestMetadata};
use crate::status::StatusRecorder;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    pub deleted: Vec<RemoteId>,
    pub failed: Vec<RemoteId>,
}

/// Attach orphan rows to the DELETED changes for their identity. Returns the
/// orphans left over for [`sweep`].
pub fn attach(changes: &mut [Change], orphans: Vec<Orphan>, current: &Snapshot) -> Vec<Orphan> {
    let mut unattached = Vec::new();
    let mut seen: HashSet<RemoteId> = HashSet::new();

    for orphan in orphans {
        if !seen.insert(orphan.remote_id.clone()) {
            tracing::warn!(
                "{}: remote id {} already handled for an earlier emptied row; skipping",
                orphan.position,
                orphan.remote_id
            );
            continue;
        }
        if current.contains(&UniqueId::from(&orphan.remote_id)) {
            tracing::warn!(
                "{}: emptied row shares remote id {} with a live row; leaving it alone",
                orphan.position,
                orphan.remote_id
            );
            continue;
        }

        let covering = changes.iter_mut().find(|change| {
            matches!(change, Change::Deleted { .. })
                && change.remote_id() == Some(&orphan.remote_id)
        });
        match covering {
            Some(Change::Deleted { row, .. }) => *row = Some(orphan.position),
            _ => unattached.push(orphan),
        }
    }

    unattached
}

/// Delete each orphan individually, clearing its row on success.
pub fn sweep(
    orphans: &[Orphan],
    remote: &dyn RemoteApi,
    recorder: &mut StatusRecorder<'_>,
    options: &SyncOptions,
) -> OrphanReport {
    let mut report = OrphanReport::default();

    for orphan in orphans {
        recorder.syncing([orphan.position]);
        let request = DeleteRowRequest {
            remote_id: orphan.remote_id.clone(),
            source_position: Some(orphan.position.0),
            metadata: RequestMetadata::now(&options.source, Some(orphan.position)),
        };
        let result = remote
            .delete_row(&request)
            .and_then(|response| response.into_result());
        options.pause();

        match result {
            Ok(()) => {
                tracing::info!("{}: deleted remote row {}", orphan.position, orphan.remote_id);
                recorder.deleted(orphan.position, "deleted remotely");
                report.deleted.push(orphan.remote_id.clone());
            }
            Err(error) => {
                tracing::warn!(
                    "{}: delete of {} failed: {error}",
                    orphan.position,
                    orphan.remote_id
                );
                recorder.error(orphan.position, format!("delete failed: {error}"));
                report.failed.push(orphan.remote_id.clone());
            }
        }
    }

    report
}
