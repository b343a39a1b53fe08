//! Record extraction: raw sheet rows to a keyed [`Snapshot`].
//!
//! Classification, in order:
//! 1. every tracked field empty, no remote id → dropped silently;
//! 2. every tracked field empty, remote id bound → [`Orphan`];
//! 3. every primary field empty → dropped (too little to identify an event);
//! 4. otherwise → a [`Record`], keyed by remote id or a row placeholder.

use std::collections::HashSet;

use rallysync_core::{Field, RawRow, Record, RemoteId, RowPosition, Snapshot};

/// A row the user emptied that is still bound to a remote record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub position: RowPosition,
    pub remote_id: RemoteId,
}

/// Output of [`extract`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub snapshot: Snapshot,
    pub orphans: Vec<Orphan>,
}

/// Turn raw rows into the current snapshot plus the orphaned rows.
pub fn extract(rows: &[RawRow]) -> Extraction {
    let mut out = Extraction::default();
    let mut seen: HashSet<RemoteId> = HashSet::new();

    for row in rows {
        let fields = row.fields.trimmed();

        if fields.is_blank() {
            if let Some(remote_id) = row.remote_id.clone() {
                tracing::debug!("{}: orphaned remote id {remote_id}", row.position);
                out.orphans.push(Orphan {
                    position: row.position,
                    remote_id,
                });
            }
            continue;
        }

        if fields.all_empty(&Field::PRIMARY) {
            tracing::debug!(
                "{}: skipped, no date/time, category, stage or players",
                row.position
            );
            continue;
        }

        let record = match row.remote_id.clone() {
            Some(remote_id) if seen.insert(remote_id.clone()) => {
                Record::provisioned(remote_id, fields, row.position)
            }
            Some(remote_id) => {
                tracing::warn!(
                    "{}: remote id {remote_id} already used by an earlier row; treating as a new record",
                    row.position
                );
                Record::local(fields, row.position)
            }
            None => Record::local(fields, row.position),
        };
        out.snapshot.insert(record);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rallysync_core::{EventFields, UniqueId};

    fn row(position: usize, fields: EventFields, remote_id: Option<&str>) -> RawRow {
        RawRow {
            position: RowPosition(position),
            fields,
            remote_id: remote_id.map(RemoteId::from),
        }
    }

    fn fixture() -> EventFields {
        EventFields::default()
            .with(Field::DateTime, "2024-05-01 10:00")
            .with(Field::Category, "MS")
            .with(Field::Player1, "Tan")
            .with(Field::Player2, "Lee")
    }

    #[test]
    fn empty_row_without_identity_is_dropped() {
        let out = extract(&[row(1, EventFields::default(), None)]);
        assert!(out.snapshot.is_empty());
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn empty_row_with_identity_is_orphaned() {
        let out = extract(&[row(3, EventFields::default(), Some("55"))]);
        assert!(out.snapshot.is_empty());
        assert_eq!(
            out.orphans,
            vec![Orphan {
                position: RowPosition(3),
                remote_id: RemoteId::from("55"),
            }]
        );
    }

    #[test]
    fn row_without_primary_fields_is_dropped_even_with_results() {
        let fields = EventFields::default()
            .with(Field::Results, "6-4 6-2")
            .with(Field::Venue, "Court 1");
        let out = extract(&[row(2, fields, Some("12"))]);
        assert!(out.snapshot.is_empty());
        assert!(out.orphans.is_empty());
    }

    #[test]
    fn bound_row_is_keyed_by_remote_id() {
        let out = extract(&[row(4, fixture(), Some("900"))]);
        let record = out.snapshot.get(&UniqueId::from("900")).expect("record");
        assert_eq!(record.position, RowPosition(4));
        assert!(record.is_provisioned());
    }

    #[test]
    fn unbound_row_gets_a_placeholder() {
        let out = extract(&[row(5, fixture(), None)]);
        let record = out
            .snapshot
            .get(&UniqueId::placeholder(RowPosition(5)))
            .expect("record");
        assert!(!record.is_provisioned());
    }

    #[test]
    fn values_are_trimmed() {
        let fields = fixture().with(Field::Results, "  6-4  ");
        let out = extract(&[row(1, fields, Some("1"))]);
        let record = out.snapshot.get(&UniqueId::from("1")).unwrap();
        assert_eq!(record.fields.results, "6-4");
    }

    #[test]
    fn duplicated_remote_id_is_demoted_to_placeholder() {
        let out = extract(&[row(1, fixture(), Some("77")), row(2, fixture(), Some("77"))]);
        assert_eq!(out.snapshot.len(), 2);
        assert!(out.snapshot.contains(&UniqueId::from("77")));
        let copy = out
            .snapshot
            .get(&UniqueId::placeholder(RowPosition(2)))
            .expect("copy");
        assert_eq!(copy.remote_id, None);
    }
}
