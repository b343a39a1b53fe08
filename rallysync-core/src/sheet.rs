//! The sheet seam: where rows come from and where statuses go back.
//!
//! The sync engine only sees the [`Sheet`] trait. [`SheetDocument`] is the
//! YAML-backed implementation used by the CLI:
//!
//! ```text
//! rows:
//!   - dateTime: 2024-05-01 10:00
//!     category: Men's Singles
//!     player1: Tan
//!     player2: Lee
//!     remoteId: "4567"
//!     syncStatus: sync success
//!     syncMessage: ""
//! ```
//!
//! Row positions are 1-based indices into `rows`. Saves use the same
//! `.tmp` + rename flow as the rest of the workspace.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{sheet_io, SheetError};
use crate::types::{cell, EventFields, RemoteId, RowPosition, RowStatus, SyncState};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One row as the sheet hands it over: tracked cells plus the bound identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub position: RowPosition,
    pub fields: EventFields,
    pub remote_id: Option<RemoteId>,
}

/// Cell-level access to the source sheet.
pub trait Sheet {
    /// Every data row, in sheet order.
    fn read_rows(&self) -> Result<Vec<RawRow>, SheetError>;

    /// Write the status and message columns of one row.
    fn write_status(&mut self, position: RowPosition, status: &RowStatus)
        -> Result<(), SheetError>;

    /// Bind (`Some`) or clear (`None`) the remote identity column of one row.
    fn write_remote_id(
        &mut self,
        position: RowPosition,
        remote_id: Option<&RemoteId>,
    ) -> Result<(), SheetError>;
}

// ---------------------------------------------------------------------------
// YAML document
// ---------------------------------------------------------------------------

/// One serialized sheet row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    #[serde(flatten)]
    pub fields: EventFields,
    #[serde(
        default,
        deserialize_with = "optional_cell",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_id: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub sync_status: String,
    #[serde(default, deserialize_with = "cell")]
    pub sync_message: String,
}

fn optional_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(cell(deserializer)?).filter(|id| !id.is_empty()))
}

impl SheetRow {
    pub fn new(fields: EventFields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// The row's bound identity; blank cells read as unbound.
    pub fn bound_remote_id(&self) -> Option<RemoteId> {
        self.remote_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(RemoteId::from)
    }

    pub fn status(&self) -> RowStatus {
        RowStatus::new(SyncState::from_token(&self.sync_status), self.sync_message.clone())
    }
}

/// In-memory sheet, loaded from and saved to a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetDocument {
    #[serde(default)]
    pub rows: Vec<SheetRow>,
}

impl SheetDocument {
    pub fn new(rows: Vec<SheetRow>) -> Self {
        Self { rows }
    }

    /// Row at a 1-based position.
    pub fn row(&self, position: RowPosition) -> Option<&SheetRow> {
        position.0.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    fn row_mut(&mut self, position: RowPosition) -> Result<&mut SheetRow, SheetError> {
        let rows = self.rows.len();
        position
            .0
            .checked_sub(1)
            .and_then(|i| self.rows.get_mut(i))
            .ok_or(SheetError::RowOutOfRange {
                position: position.0,
                rows,
            })
    }
}

impl Sheet for SheetDocument {
    fn read_rows(&self) -> Result<Vec<RawRow>, SheetError> {
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| RawRow {
                position: RowPosition(i + 1),
                fields: row.fields.clone(),
                remote_id: row.bound_remote_id(),
            })
            .collect())
    }

    fn write_status(
        &mut self,
        position: RowPosition,
        status: &RowStatus,
    ) -> Result<(), SheetError> {
        let row = self.row_mut(position)?;
        row.sync_status = status.state.token().to_string();
        row.sync_message = status.message.clone();
        Ok(())
    }

    fn write_remote_id(
        &mut self,
        position: RowPosition,
        remote_id: Option<&RemoteId>,
    ) -> Result<(), SheetError> {
        let row = self.row_mut(position)?;
        row.remote_id = remote_id.map(|id| id.0.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load a sheet document from `path`.
///
/// Returns `SheetError::SheetNotFound` if absent, `SheetError::Parse` (with
/// path + line context) if malformed.
pub fn load_at(path: &Path) -> Result<SheetDocument, SheetError> {
    if !path.exists() {
        return Err(SheetError::SheetNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| sheet_io(path, e))?;
    if contents.trim().is_empty() {
        return Ok(SheetDocument::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| SheetError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically save a sheet document: serialize → `<path>.tmp` → rename.
pub fn save_at(path: &Path, document: &SheetDocument) -> Result<(), SheetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| sheet_io(parent, e))?;
    }
    let yaml = serde_yaml::to_string(document)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| sheet_io(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(sheet_io(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;
    use tempfile::TempDir;

    fn doc() -> SheetDocument {
        SheetDocument::new(vec![
            SheetRow::new(
                EventFields::default()
                    .with(Field::Player1, "Tan")
                    .with(Field::Player2, "Lee"),
            )
            .with_remote_id("42"),
            SheetRow::new(EventFields::default().with(Field::Venue, "Court 3")),
        ])
    }

    #[test]
    fn read_rows_uses_one_based_positions() {
        let rows = doc().read_rows().expect("read");
        assert_eq!(rows[0].position, RowPosition(1));
        assert_eq!(rows[0].remote_id, Some(RemoteId::from("42")));
        assert_eq!(rows[1].position, RowPosition(2));
        assert_eq!(rows[1].remote_id, None);
    }

    #[test]
    fn blank_remote_id_cell_reads_as_unbound() {
        let row = SheetRow::new(EventFields::default()).with_remote_id("  ");
        assert_eq!(row.bound_remote_id(), None);
    }

    #[test]
    fn write_status_and_remote_id() {
        let mut sheet = doc();
        sheet
            .write_status(RowPosition(2), &RowStatus::error("boom"))
            .expect("status");
        sheet
            .write_remote_id(RowPosition(1), None)
            .expect("clear id");
        assert_eq!(sheet.rows[1].sync_status, "error");
        assert_eq!(sheet.rows[1].sync_message, "boom");
        assert_eq!(sheet.rows[0].remote_id, None);
    }

    #[test]
    fn write_outside_sheet_is_an_error() {
        let mut sheet = doc();
        let err = sheet
            .write_status(RowPosition(9), &RowStatus::syncing())
            .unwrap_err();
        assert!(matches!(err, SheetError::RowOutOfRange { position: 9, rows: 2 }));
        assert!(sheet
            .write_status(RowPosition(0), &RowStatus::syncing())
            .is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("fixtures.yaml");
        save_at(&path, &doc()).expect("save");
        let loaded = load_at(&path).expect("load");
        assert_eq!(loaded, doc());
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn load_missing_sheet_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_at(&tmp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, SheetError::SheetNotFound { .. }));
    }

    #[test]
    fn load_malformed_sheet_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.yaml");
        std::fs::write(&path, "rows: [unterminated").unwrap();
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, SheetError::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }
}
