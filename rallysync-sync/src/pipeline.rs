//! Shared sync pipeline entrypoint used by the CLI.

use std::path::{Path, PathBuf};

use rallysync_core::{config, sheet, SyncConfig};
use sha2::{Digest, Sha256};

use crate::engine::{CycleReport, Preview, SyncEngine, SyncOptions};
use crate::remote::HttpRemote;
use crate::snapshot_store::FileSnapshotStore;
use crate::SyncError;

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Synced(CycleReport),
    /// `dry_run` was set; nothing was sent or written.
    DryRun(Preview),
}

/// Baseline name for a sheet file: its file stem followed by the first 12 hex
/// digits of the SHA-256 of its canonical path. Two sheets share a baseline
/// only if they are the same file.
pub fn baseline_key(sheet_path: &Path) -> String {
    let stem = sheet_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "sheet".to_string());
    let digest = hex::encode(Sha256::digest(
        absolute_path(sheet_path).to_string_lossy().as_bytes(),
    ));
    format!("{stem}-{}", &digest[..12])
}

fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

fn engine_for(
    home: &Path,
    sheet_path: &Path,
    config: &SyncConfig,
) -> SyncEngine<HttpRemote, FileSnapshotStore> {
    SyncEngine::new(
        HttpRemote::from_config(config),
        FileSnapshotStore::new(home, baseline_key(sheet_path)),
        SyncOptions::from_config(config),
    )
}

/// Run one cycle for the sheet at `sheet_path`.
///
/// The sheet is saved afterwards even when the cycle fails, so statuses
/// written before the failure persist. A save failure after a failed cycle
/// is logged and the cycle's error is returned.
pub fn run(home: &Path, sheet_path: &Path, dry_run: bool) -> Result<RunOutcome, SyncError> {
    let config = config::load_at(home)?;
    let mut document = sheet::load_at(sheet_path)?;
    let engine = engine_for(home, sheet_path, &config);

    if dry_run {
        return Ok(RunOutcome::DryRun(engine.preview(&document)?));
    }

    let result = engine.run_cycle(&mut document);
    match (sheet::save_at(sheet_path, &document), result) {
        (Ok(()), result) => result.map(RunOutcome::Synced),
        (Err(err), Ok(_)) => Err(err.into()),
        (Err(err), Err(cycle)) => {
            tracing::error!("could not save {}: {err}", sheet_path.display());
            Err(cycle)
        }
    }
}

/// Pending changes for the sheet at `sheet_path`, without side effects.
pub fn preview(home: &Path, sheet_path: &Path) -> Result<Preview, SyncError> {
    let config = config::load_at(home)?;
    let document = sheet::load_at(sheet_path)?;
    engine_for(home, sheet_path, &config).preview(&document)
}
