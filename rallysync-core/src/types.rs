//! Domain types shared by the extractor, detector and dispatcher.
//!
//! Field values are plain `String`s; an absent value is the empty string,
//! never a missing key.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity assigned by the remote store once a record has been created there.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// 1-based row number in the source sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowPosition(pub usize);

impl fmt::Display for RowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Snapshot key: the remote id when one is bound, else a placeholder derived
/// from the row position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueId(pub String);

const PLACEHOLDER_PREFIX: &str = "row:";

impl UniqueId {
    pub fn placeholder(position: RowPosition) -> Self {
        Self(format!("{PLACEHOLDER_PREFIX}{}", position.0))
    }
}

impl From<&RemoteId> for UniqueId {
    fn from(id: &RemoteId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&str> for UniqueId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// A tracked attribute of an event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    DateTime,
    Venue,
    Category,
    Stage,
    Round,
    Player1,
    Player2,
    Results,
}

impl Field {
    /// Every tracked field, in canonical (column) order.
    pub const ALL: [Field; 8] = [
        Field::DateTime,
        Field::Venue,
        Field::Category,
        Field::Stage,
        Field::Round,
        Field::Player1,
        Field::Player2,
        Field::Results,
    ];

    /// A row with all of these empty cannot identify an event.
    pub const PRIMARY: [Field; 5] = [
        Field::DateTime,
        Field::Category,
        Field::Stage,
        Field::Player1,
        Field::Player2,
    ];

    /// Minimum data the remote store needs to create a row.
    pub const REQUIRED_FOR_CREATE: [Field; 3] = [Field::DateTime, Field::Player1, Field::Player2];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::DateTime => "dateTime",
            Field::Venue => "venue",
            Field::Category => "category",
            Field::Stage => "stage",
            Field::Round => "round",
            Field::Player1 => "player1",
            Field::Player2 => "player2",
            Field::Results => "results",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tracked values of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    #[serde(default, deserialize_with = "cell")]
    pub date_time: String,
    #[serde(default, deserialize_with = "cell")]
    pub venue: String,
    #[serde(default, deserialize_with = "cell")]
    pub category: String,
    #[serde(default, deserialize_with = "cell")]
    pub stage: String,
    #[serde(default, deserialize_with = "cell")]
    pub round: String,
    #[serde(default, deserialize_with = "cell")]
    pub player1: String,
    #[serde(default, deserialize_with = "cell")]
    pub player2: String,
    #[serde(default, deserialize_with = "cell")]
    pub results: String,
}

/// Reads a cell as text. Hand-written YAML leaves numbers and booleans
/// unquoted (`round: 1`), and null reads as an empty cell.
pub(crate) fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CellVisitor)
}

struct CellVisitor;

impl<'de> Visitor<'de> for CellVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean cell")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }
}

impl EventFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::DateTime => &self.date_time,
            Field::Venue => &self.venue,
            Field::Category => &self.category,
            Field::Stage => &self.stage,
            Field::Round => &self.round,
            Field::Player1 => &self.player1,
            Field::Player2 => &self.player2,
            Field::Results => &self.results,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::DateTime => self.date_time = value,
            Field::Venue => self.venue = value,
            Field::Category => self.category = value,
            Field::Stage => self.stage = value,
            Field::Round => self.round = value,
            Field::Player1 => self.player1 = value,
            Field::Player2 => self.player2 = value,
            Field::Results => self.results = value,
        }
    }

    /// Builder-style [`set`](Self::set), handy for fixtures.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Copy with every value trimmed of surrounding whitespace.
    pub fn trimmed(&self) -> Self {
        let mut out = Self::default();
        for field in Field::ALL {
            out.set(field, self.get(field).trim());
        }
        out
    }

    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).trim().is_empty())
    }

    /// `true` if every field in `fields` is empty.
    pub fn all_empty(&self, fields: &[Field]) -> bool {
        fields.iter().all(|f| self.get(*f).trim().is_empty())
    }

    /// Fields from `fields` that are empty.
    pub fn missing(&self, fields: &[Field]) -> Vec<Field> {
        fields
            .iter()
            .copied()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Records and snapshots
// ---------------------------------------------------------------------------

/// One logical event, rebuilt from the sheet every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub unique_id: UniqueId,
    pub fields: EventFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    pub position: RowPosition,
}

impl Record {
    /// A record already bound to a remote identity.
    pub fn provisioned(remote_id: RemoteId, fields: EventFields, position: RowPosition) -> Self {
        Self {
            unique_id: UniqueId::from(&remote_id),
            fields,
            remote_id: Some(remote_id),
            position,
        }
    }

    /// A record that only exists locally so far.
    pub fn local(fields: EventFields, position: RowPosition) -> Self {
        Self {
            unique_id: UniqueId::placeholder(position),
            fields,
            remote_id: None,
            position,
        }
    }

    pub fn is_provisioned(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Point-in-time view of all records, keyed by [`UniqueId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: BTreeMap<UniqueId, Record>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` under its own `unique_id`, returning any record it displaced.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.unique_id.clone(), record)
    }

    pub fn get(&self, id: &UniqueId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &UniqueId) -> bool {
        self.records.contains_key(id)
    }

    pub fn remove(&mut self, id: &UniqueId) -> Option<Record> {
        self.records.remove(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UniqueId, &Record)> {
        self.records.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Changes
// ---------------------------------------------------------------------------

/// One field that differs between the baseline and current record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDelta {
    pub field: Field,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    New,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::New => write!(f, "NEW"),
            ChangeKind::Updated => write!(f, "UPDATED"),
            ChangeKind::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A detected delta between the current snapshot and the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum Change {
    New {
        #[serde(rename = "uniqueId")]
        unique_id: UniqueId,
        record: Record,
    },
    Updated {
        #[serde(rename = "uniqueId")]
        unique_id: UniqueId,
        record: Record,
        previous: Record,
        #[serde(rename = "changedFields")]
        changed_fields: Vec<FieldDelta>,
    },
    Deleted {
        #[serde(rename = "uniqueId")]
        unique_id: UniqueId,
        previous: Record,
        /// Current sheet row still bound to this identity, if any.
        row: Option<RowPosition>,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::New { .. } => ChangeKind::New,
            Change::Updated { .. } => ChangeKind::Updated,
            Change::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    pub fn unique_id(&self) -> &UniqueId {
        match self {
            Change::New { unique_id, .. }
            | Change::Updated { unique_id, .. }
            | Change::Deleted { unique_id, .. } => unique_id,
        }
    }

    /// The record a remote mutation acts on: new state for NEW/UPDATED, old
    /// state for DELETED.
    pub fn subject(&self) -> &Record {
        match self {
            Change::New { record, .. } | Change::Updated { record, .. } => record,
            Change::Deleted { previous, .. } => previous,
        }
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.subject().remote_id.as_ref()
    }

    /// Sheet row that receives this change's status, if it still exists.
    pub fn status_row(&self) -> Option<RowPosition> {
        match self {
            Change::New { record, .. } | Change::Updated { record, .. } => Some(record.position),
            Change::Deleted { row, .. } => *row,
        }
    }

    pub fn changed_fields(&self) -> &[FieldDelta] {
        match self {
            Change::Updated { changed_fields, .. } => changed_fields,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Row status
// ---------------------------------------------------------------------------

/// Status token written to a row's status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
    Deleted,
}

impl SyncState {
    pub fn token(self) -> &'static str {
        match self {
            SyncState::Idle => "",
            SyncState::Syncing => "syncing",
            SyncState::Success => "sync success",
            SyncState::Error => "error",
            SyncState::Deleted => "deleted",
        }
    }

    /// Parse a status cell. Unknown text reads as [`SyncState::Idle`].
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "syncing" => SyncState::Syncing,
            "sync success" => SyncState::Success,
            "error" => SyncState::Error,
            "deleted" => SyncState::Deleted,
            _ => SyncState::Idle,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Status token plus free-text message for one row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowStatus {
    pub state: SyncState,
    pub message: String,
}

impl RowStatus {
    pub fn new(state: SyncState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn syncing() -> Self {
        Self::new(SyncState::Syncing, "")
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(SyncState::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(SyncState::Error, message)
    }

    pub fn deleted(message: impl Into<String>) -> Self {
        Self::new(SyncState::Deleted, message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
