//! Identity provisioning: create remote rows for local-only records.
//!
//! One `CREATE_HUBDB_ROW` call per qualifying record, sequential, with the
//! configured pause after each. A failure only affects its own row; the
//! record stays local-only and is retried next cycle.

use rallysync_core::{Change, Field, Record, RemoteId, RowPosition, Snapshot, UniqueId};

use crate::engine::SyncOptions;
use crate::remote::{CreateRowRequest, RemoteApi, RemoteError, RequestMetadata};
use crate::status::StatusRecorder;

/// A record that received a remote identity this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub placeholder: UniqueId,
    pub remote_id: RemoteId,
    pub position: RowPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionFailure {
    pub unique_id: UniqueId,
    pub position: RowPosition,
    pub error: RemoteError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub provisioned: Vec<Provisioned>,
    pub failures: Vec<ProvisionFailure>,
}

/// `true` when a record is local-only and carries enough data to be created.
pub fn qualifies(record: &Record) -> bool {
    !record.is_provisioned() && record.fields.missing(&Field::REQUIRED_FOR_CREATE).is_empty()
}

/// Records to provision: targets of NEW/UPDATED changes, or every current
/// record when the baseline is empty and `provision_all_on_empty_baseline`
/// is set. With the flag unset an empty baseline yields no targets at all.
/// Non-qualifying candidates are skipped with a debug log.
pub fn select_targets(
    current: &Snapshot,
    changes: &[Change],
    baseline_empty: bool,
    options: &SyncOptions,
) -> Vec<Record> {
    let candidates: Vec<&Record> = if baseline_empty {
        if !options.provision_all_on_empty_baseline {
            tracing::info!("first sync: provisioning deferred until rows are edited");
            return Vec::new();
        }
        current.records().collect()
    } else {
        changes
            .iter()
            .filter_map(|change| match change {
                Change::New { record, .. } | Change::Updated { record, .. } => Some(record),
                Change::Deleted { .. } => None,
            })
            .collect()
    };

    candidates
        .into_iter()
        .filter(|record| {
            if record.is_provisioned() {
                return false;
            }
            if !qualifies(record) {
                let missing = record.fields.missing(&Field::REQUIRED_FOR_CREATE);
                let names: Vec<_> = missing.iter().map(|f| f.as_str()).collect();
                tracing::debug!(
                    "{}: not provisioned, missing {}",
                    record.position,
                    names.join(", ")
                );
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// Create a remote row for each record in `targets`.
pub fn provision(
    targets: &[Record],
    remote: &dyn RemoteApi,
    recorder: &mut StatusRecorder<'_>,
    options: &SyncOptions,
) -> ProvisionReport {
    let mut report = ProvisionReport::default();

    for record in targets {
        recorder.syncing([record.position]);
        let request = CreateRowRequest {
            unique_id: record.unique_id.clone(),
            data: record.fields.clone(),
            metadata: RequestMetadata::now(&options.source, Some(record.position)),
        };
        let result = remote
            .create_row(&request)
            .and_then(|response| response.into_remote_id());
        options.pause();

        match result {
            Ok(remote_id) => {
                tracing::info!("{}: created remote row {remote_id}", record.position);
                recorder.bind(record.position, &remote_id);
                recorder.success(record.position, format!("created remote row {remote_id}"));
                report.provisioned.push(Provisioned {
                    placeholder: record.unique_id.clone(),
                    remote_id,
                    position: record.position,
                });
            }
            Err(error) => {
                tracing::warn!("{}: create failed: {error}", record.position);
                recorder.error(record.position, format!("create failed: {error}"));
                report.failures.push(ProvisionFailure {
                    unique_id: record.unique_id.clone(),
                    position: record.position,
                    error,
                });
            }
        }
    }

    report
}

/// Move a just-provisioned record from its placeholder key to its remote id,
/// in both the current snapshot and the pending change list, so it carries
/// on as the same logical record.
///
/// Returns `false` if `placeholder` was not in `current`.
pub fn reconcile_provisioned(
    current: &mut Snapshot,
    changes: &mut [Change],
    placeholder: &UniqueId,
    remote_id: &RemoteId,
) -> bool {
    let Some(mut record) = current.remove(placeholder) else {
        tracing::warn!("cannot reconcile {placeholder}: not in current snapshot");
        return false;
    };
    let new_id = UniqueId::from(remote_id);
    record.unique_id = new_id.clone();
    record.remote_id = Some(remote_id.clone());

    if let Some(displaced) = current.insert(record.clone()) {
        tracing::warn!(
            "remote id {remote_id} returned for {} is also bound to {}",
            record.position,
            displaced.position
        );
    }

    for change in changes.iter_mut() {
        if change.unique_id() != placeholder {
            continue;
        }
        match change {
            Change::New {
                unique_id,
                record: pending,
            }
            | Change::Updated {
                unique_id,
                record: pending,
                ..
            } => {
                *unique_id = new_id.clone();
                *pending = record.clone();
            }
            Change::Deleted { .. } => {}
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
