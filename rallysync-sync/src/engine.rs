//! One reconciliation cycle, end to end.
//!
//! ```text
//! read → extract → load baseline → detect → clear statuses → provision
//!      → attach/sweep orphans → dispatch → save baseline
//! ```
//!
//! The baseline is only replaced after dispatch succeeds; a fatal delivery
//! failure leaves it as it was so the next cycle sees the same change set.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use rallysync_core::{
    Change, ChangeKind, RowPosition, RowStatus, Sheet, Snapshot, SyncConfig, SyncState,
    UniqueId,
};

use crate::detect::detect_changes;
use crate::dispatch::{dispatch, DispatchReport};
use crate::error::SyncError;
use crate::extract::{extract, Orphan};
use crate::orphans::{self, OrphanReport};
use crate::provision::{self, ProvisionReport};
use crate::remote::RemoteApi;
use crate::snapshot_store::SnapshotStore;
use crate::status::StatusRecorder;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-cycle knobs, usually derived from [`SyncConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Stamped into every request's metadata.
    pub source: String,
    /// Pause after each create or delete call.
    pub call_delay: Duration,
    pub provision_all_on_empty_baseline: bool,
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            source: config.source.clone(),
            call_delay: config.call_delay(),
            provision_all_on_empty_baseline: config.provision_all_on_empty_baseline,
        }
    }

    /// No pauses between calls.
    pub fn immediate(source: &str) -> Self {
        Self {
            source: source.to_string(),
            call_delay: Duration::ZERO,
            provision_all_on_empty_baseline: true,
        }
    }

    pub fn pause(&self) {
        if !self.call_delay.is_zero() {
            std::thread::sleep(self.call_delay);
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Number of detected changes per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub new: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ChangeCounts {
    pub fn of(changes: &[Change]) -> Self {
        let mut counts = Self::default();
        for change in changes {
            match change.kind() {
                ChangeKind::New => counts.new += 1,
                ChangeKind::Updated => counts.updated += 1,
                ChangeKind::Deleted => counts.deleted += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.new + self.updated + self.deleted
    }
}

/// Outcome of a successful [`SyncEngine::run_cycle`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub changes: ChangeCounts,
    pub provision: ProvisionReport,
    pub dispatch: DispatchReport,
    pub orphans: OrphanReport,
    pub baseline_saved: bool,
    /// Rows whose final status this cycle is an error.
    pub row_errors: usize,
    /// Final status written to each touched row.
    pub rows: BTreeMap<RowPosition, RowStatus>,
}

impl CycleReport {
    /// `true` if nothing was pending.
    pub fn is_noop(&self) -> bool {
        self.changes.total() == 0
            && self.provision.provisioned.is_empty()
            && self.provision.failures.is_empty()
            && self.orphans.deleted.is_empty()
            && self.orphans.failed.is_empty()
    }
}

/// What a cycle would do, computed without touching the sheet or the remote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preview {
    pub changes: Vec<Change>,
    /// Orphans whose identity the baseline does not know; a cycle would
    /// delete them individually.
    pub orphans: Vec<Orphan>,
    /// Local-only records a cycle would try to provision.
    pub to_provision: Vec<UniqueId>,
    pub current_records: usize,
    pub baseline_records: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SyncEngine<R, S> {
    remote: R,
    store: S,
    options: SyncOptions,
}

impl<R: RemoteApi, S: SnapshotStore> SyncEngine<R, S> {
    pub fn new(remote: R, store: S, options: SyncOptions) -> Self {
        Self {
            remote,
            store,
            options,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn load_baseline(&self) -> Snapshot {
        match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!("could not load baseline, treating it as empty: {err}");
                Snapshot::new()
            }
        }
    }

    /// Changes a cycle would act on, without side effects.
    pub fn preview(&self, sheet: &dyn Sheet) -> Result<Preview, SyncError> {
        let extraction = extract(&sheet.read_rows()?);
        let baseline = self.load_baseline();
        let mut changes = detect_changes(&extraction.snapshot, &baseline);
        let orphans = orphans::attach(&mut changes, extraction.orphans, &extraction.snapshot);
        let to_provision = provision::select_targets(
            &extraction.snapshot,
            &changes,
            baseline.is_empty(),
            &self.options,
        )
        .into_iter()
        .map(|record| record.unique_id)
        .collect();

        Ok(Preview {
            changes,
            orphans,
            to_provision,
            current_records: extraction.snapshot.len(),
            baseline_records: baseline.len(),
        })
    }

    /// Run one full reconciliation cycle against `sheet`.
    ///
    /// Returns `Err` when the sheet cannot be read or the combined change
    /// request fails; in both cases the baseline is left untouched.
    pub fn run_cycle(&self, sheet: &mut dyn Sheet) -> Result<CycleReport, SyncError> {
        let extraction = extract(&sheet.read_rows()?);
        let mut current = extraction.snapshot;
        let baseline = self.load_baseline();
        let mut changes = detect_changes(&current, &baseline);
        let sweep = orphans::attach(&mut changes, extraction.orphans, &current);
        let targets =
            provision::select_targets(&current, &changes, baseline.is_empty(), &self.options);

        let counts = ChangeCounts::of(&changes);
        tracing::info!(
            "{} record(s), baseline {}: {} new, {} updated, {} deleted, {} orphan(s)",
            current.len(),
            baseline.len(),
            counts.new,
            counts.updated,
            counts.deleted,
            sweep.len()
        );

        let mut recorder = StatusRecorder::new(sheet);

        let touched: BTreeSet<RowPosition> = changes
            .iter()
            .filter_map(Change::status_row)
            .chain(targets.iter().map(|record| record.position))
            .chain(sweep.iter().map(|orphan| orphan.position))
            .collect();
        recorder.clear(touched);

        let provision = provision::provision(&targets, &self.remote, &mut recorder, &self.options);
        for created in &provision.provisioned {
            provision::reconcile_provisioned(
                &mut current,
                &mut changes,
                &created.placeholder,
                &created.remote_id,
            );
        }

        let orphans = orphans::sweep(&sweep, &self.remote, &mut recorder, &self.options);

        let dispatch = dispatch(changes, &self.remote, &mut recorder, &self.options)?;

        let failed: BTreeSet<&UniqueId> = provision
            .failures
            .iter()
            .map(|failure| &failure.unique_id)
            .collect();
        let mut next: Snapshot = current
            .records()
            .filter(|record| !failed.contains(&record.unique_id))
            .cloned()
            .collect();
        for remote_id in &dispatch.delete_failures {
            let key = UniqueId::from(remote_id);
            if let Some(previous) = baseline.get(&key) {
                next.insert(previous.clone());
            }
        }
        let baseline_saved = match self.store.save(&next) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("could not save baseline: {err}");
                false
            }
        };

        Ok(CycleReport {
            changes: counts,
            provision,
            dispatch,
            orphans,
            baseline_saved,
            row_errors: recorder.count(SyncState::Error),
            rows: recorder.into_outcomes(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
