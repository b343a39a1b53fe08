//! Baseline snapshot persistence.
//!
//! [`FileSnapshotStore`] persists a [`SnapshotFile`] JSON document at
//! `<home>/.rallysync/snapshots/<sheet_name>.json`. Writes use the same
//! atomic `.tmp` + rename pattern as the sheet and config files.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rallysync_core::Snapshot;

use crate::error::{io_err, SyncError};

/// Where the baseline for one sheet lives.
pub trait SnapshotStore {
    /// Load the last saved baseline. A store that was never written yields an
    /// empty snapshot.
    fn load(&self) -> Result<Snapshot, SyncError>;

    /// Replace the baseline wholesale.
    fn save(&self, snapshot: &Snapshot) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// On-disk baseline payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotFile {
    pub synced_at: DateTime<Utc>,
    pub records: Snapshot,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotCompat {
    Structured(SnapshotStructuredCompat),
    Legacy(Snapshot),
}

#[derive(Debug, Deserialize)]
struct SnapshotStructuredCompat {
    pub synced_at: Option<DateTime<Utc>>,
    pub records: Snapshot,
}

/// Path to the baseline JSON for a given sheet, rooted at `home`.
///
/// `~/.rallysync/snapshots/<sheet_name>.json`
pub fn store_path_at(home: &Path, sheet_name: &str) -> PathBuf {
    home.join(".rallysync")
        .join("snapshots")
        .join(format!("{sheet_name}.json"))
}

/// Load the baseline file for `sheet_name`.
///
/// Returns `None` if the file does not yet exist. A bare `uniqueId → record`
/// mapping is accepted and given the current time as `synced_at`.
pub fn load_file_at(home: &Path, sheet_name: &str) -> Result<Option<SnapshotFile>, SyncError> {
    let path = store_path_at(home, sheet_name);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let file = match serde_json::from_str::<SnapshotCompat>(&contents)? {
        SnapshotCompat::Structured(store) => SnapshotFile {
            synced_at: store.synced_at.unwrap_or_else(Utc::now),
            records: store.records,
        },
        SnapshotCompat::Legacy(records) => SnapshotFile {
            synced_at: Utc::now(),
            records,
        },
    };
    Ok(Some(file))
}

/// Save the baseline file for `sheet_name` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_file_at(home: &Path, sheet_name: &str, file: &SnapshotFile) -> Result<(), SyncError> {
    let path = store_path_at(home, sheet_name);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid snapshot store path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(file)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// [`SnapshotStore`] backed by one JSON file per sheet.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    home: PathBuf,
    sheet_name: String,
}

impl FileSnapshotStore {
    pub fn new(home: impl Into<PathBuf>, sheet_name: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            sheet_name: sheet_name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        store_path_at(&self.home, &self.sheet_name)
    }

    /// When the baseline was last saved, if ever.
    pub fn synced_at(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(load_file_at(&self.home, &self.sheet_name)?.map(|f| f.synced_at))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Snapshot, SyncError> {
        Ok(load_file_at(&self.home, &self.sheet_name)?
            .map(|f| f.records)
            .unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        let file = SnapshotFile {
            synced_at: Utc::now(),
            records: snapshot.clone(),
        };
        save_file_at(&self.home, &self.sheet_name, &file)
    }
}

// ---------------------------------------------------------------------------
// Memory store
// ---------------------------------------------------------------------------

/// In-process [`SnapshotStore`]; counts saves so callers can assert on them.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: RefCell<Snapshot>,
    saves: RefCell<usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RefCell::new(snapshot),
            saves: RefCell::new(0),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Snapshot, SyncError> {
        Ok(self.snapshot.borrow().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        *self.snapshot.borrow_mut() = snapshot.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
