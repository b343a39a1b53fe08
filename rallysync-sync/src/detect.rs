//! Change detection: current snapshot vs. baseline.
//!
//! NEW and UPDATED are emitted first, in current-key order, then DELETED in
//! baseline-key order. Both snapshots are `BTreeMap`-backed, so the same
//! inputs always produce the same list.

use sha2::{Digest, Sha256};

use rallysync_core::{Change, Field, FieldDelta, Record, Snapshot};

/// SHA-256 over a record's tracked fields, in canonical field order.
pub fn fingerprint(record: &Record) -> String {
    let mut h = Sha256::new();
    for field in Field::ALL {
        let value = record.fields.get(field);
        // Length prefix keeps ("ab","c") distinct from ("a","bc").
        h.update((value.len() as u64).to_le_bytes());
        h.update(value.as_bytes());
    }
    hex::encode(h.finalize())
}

/// Per-field deltas between `old` and `new`, in canonical field order.
pub fn field_deltas(old: &Record, new: &Record) -> Vec<FieldDelta> {
    Field::ALL
        .iter()
        .filter_map(|&field| {
            let old_value = old.fields.get(field);
            let new_value = new.fields.get(field);
            (old_value != new_value).then(|| FieldDelta {
                field,
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            })
        })
        .collect()
}

/// Diff `current` against `baseline`.
pub fn detect_changes(current: &Snapshot, baseline: &Snapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    for (id, record) in current.iter() {
        match baseline.get(id) {
            None => changes.push(Change::New {
                unique_id: id.clone(),
                record: record.clone(),
            }),
            Some(previous) => {
                if fingerprint(previous) == fingerprint(record) {
                    continue;
                }
                let changed_fields = field_deltas(previous, record);
                if changed_fields.is_empty() {
                    continue;
                }
                changes.push(Change::Updated {
                    unique_id: id.clone(),
                    record: record.clone(),
                    previous: previous.clone(),
                    changed_fields,
                });
            }
        }
    }

    for (id, previous) in baseline.iter() {
        if current.contains(id) {
            continue;
        }
        if previous.remote_id.is_none() {
            tracing::debug!("{id} vanished before it was provisioned; nothing to delete");
            continue;
        }
        changes.push(Change::Deleted {
            unique_id: id.clone(),
            previous: previous.clone(),
            row: None,
        });
    }

    tracing::debug!(
        "detected {} change(s) across {} current / {} baseline record(s)",
        changes.len(),
        current.len(),
        baseline.len()
    );
    changes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rallysync_core::{ChangeKind, EventFields, RemoteId, RowPosition, UniqueId};

    fn match_fields(results: &str) -> EventFields {
        EventFields::default()
            .with(Field::DateTime, "2024-05-01 10:00")
            .with(Field::Player1, "Tan")
            .with(Field::Player2, "Lee")
            .with(Field::Results, results)
    }

    fn bound(id: &str, fields: EventFields, row: usize) -> Record {
        Record::provisioned(RemoteId::from(id), fields, RowPosition(row))
    }

    fn snapshot(records: Vec<Record>) -> Snapshot {
        records.into_iter().collect()
    }

    #[test]
    fn cleared_result_is_a_single_field_update() {
        let current = snapshot(vec![bound("7", match_fields(""), 2)]);
        let baseline = snapshot(vec![bound("7", match_fields("6-4"), 2)]);

        let changes = detect_changes(&current, &baseline);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Updated);
        assert_eq!(
            changes[0].changed_fields(),
            &[FieldDelta {
                field: Field::Results,
                old_value: "6-4".to_string(),
                new_value: String::new(),
            }]
        );
    }

    #[test]
    fn row_moves_alone_are_not_updates() {
        let current = snapshot(vec![bound("7", match_fields("6-4"), 9)]);
        let baseline = snapshot(vec![bound("7", match_fields("6-4"), 2)]);
        assert!(detect_changes(&current, &baseline).is_empty());
    }

    #[test]
    fn unseen_key_is_new() {
        let current = snapshot(vec![Record::local(match_fields(""), RowPosition(3))]);
        let changes = detect_changes(&current, &Snapshot::new());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::New);
        assert_eq!(changes[0].unique_id(), &UniqueId::placeholder(RowPosition(3)));
    }

    #[test]
    fn vanished_bound_record_is_deleted() {
        let baseline = snapshot(vec![bound("8", match_fields("6-1"), 4)]);
        let changes = detect_changes(&Snapshot::new(), &baseline);
        assert_eq!(changes.len(), 1);
        match &changes[0] {
            Change::Deleted { unique_id, previous, row } => {
                assert_eq!(unique_id, &UniqueId::from("8"));
                assert_eq!(previous.remote_id, Some(RemoteId::from("8")));
                assert_eq!(*row, None);
            }
            other => panic!("expected deleted, got {other:?}"),
        }
    }

    #[test]
    fn vanished_placeholder_is_ignored() {
        let baseline = snapshot(vec![Record::local(match_fields(""), RowPosition(4))]);
        assert!(detect_changes(&Snapshot::new(), &baseline).is_empty());
    }

    #[test]
    fn deletions_follow_new_and_updated() {
        let current = snapshot(vec![
            bound("1", match_fields("x"), 1),
            bound("3", match_fields(""), 3),
        ]);
        let baseline = snapshot(vec![
            bound("1", match_fields(""), 1),
            bound("2", match_fields(""), 2),
        ]);
        let kinds: Vec<_> = detect_changes(&current, &baseline)
            .iter()
            .map(Change::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Updated, ChangeKind::New, ChangeKind::Deleted]
        );
    }

    #[test]
    fn repeated_detection_gives_the_same_list() {
        let current = snapshot(vec![
            bound("1", match_fields("21-15"), 1),
            Record::local(match_fields(""), RowPosition(2)),
            bound("4", match_fields(""), 4),
        ]);
        let baseline = snapshot(vec![
            bound("1", match_fields(""), 1),
            bound("2", match_fields("6-4"), 2),
            bound("4", match_fields(""), 4),
        ]);

        let first = detect_changes(&current, &baseline);
        let second = detect_changes(&current, &baseline);

        assert_eq!(first, second);
        let kinds: Vec<_> = first.iter().map(Change::kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Updated, ChangeKind::New, ChangeKind::Deleted]
        );
    }

    #[test]
    fn fingerprint_separates_field_boundaries() {
        let a = bound(
            "1",
            EventFields::default()
                .with(Field::Player1, "ab")
                .with(Field::Player2, "c"),
            1,
        );
        let b = bound(
            "1",
            EventFields::default()
                .with(Field::Player1, "a")
                .with(Field::Player2, "bc"),
            1,
        );
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
