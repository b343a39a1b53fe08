#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use rallysync_core::{ChangeKind, EventFields, Field, SheetRow};
use rallysync_sync::remote::{
    BatchDeleteRequest, BatchDeleteResponse, ChangeBatchRequest, CreateRowRequest,
    CreateRowResponse, DeleteOutcome, DeleteRowRequest, DeleteRowResponse,
};
use rallysync_sync::{RemoteApi, RemoteError};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fields(player1: &str, player2: &str) -> EventFields {
    EventFields::default()
        .with(Field::DateTime, "2024-05-01 10:00")
        .with(Field::Venue, "Court 1")
        .with(Field::Category, "Men's Singles")
        .with(Field::Stage, "Group A")
        .with(Field::Player1, player1)
        .with(Field::Player2, player2)
}

pub fn row(player1: &str, player2: &str) -> SheetRow {
    SheetRow::new(fields(player1, player2))
}

/// An in-memory remote table: creates allocate numeric ids, deletes and the
/// combined request are applied to `rows`.
#[derive(Default)]
pub struct HubTable {
    pub rows: RefCell<BTreeMap<String, EventFields>>,
    next_id: RefCell<u64>,
    pub calls: RefCell<Vec<&'static str>>,
    /// When set, the combined request fails with this status.
    pub fail_changes: RefCell<Option<u16>>,
    /// Ids the batch call reports as not deleted.
    pub undeletable: RefCell<Vec<String>>,
}

impl HubTable {
    pub fn new() -> Self {
        Self {
            next_id: RefCell::new(1000),
            ..Self::default()
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.borrow().keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl RemoteApi for HubTable {
    fn create_row(&self, request: &CreateRowRequest) -> Result<CreateRowResponse, RemoteError> {
        self.calls.borrow_mut().push("create");
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        let id = next.to_string();
        self.rows.borrow_mut().insert(id.clone(), request.data.clone());
        Ok(CreateRowResponse {
            success: true,
            remote_id: Some(id),
            message: None,
        })
    }

    fn batch_delete(
        &self,
        request: &BatchDeleteRequest,
    ) -> Result<BatchDeleteResponse, RemoteError> {
        self.calls.borrow_mut().push("batch_delete");
        let undeletable = self.undeletable.borrow();
        let mut rows = self.rows.borrow_mut();
        let results = request
            .remote_ids
            .iter()
            .map(|id| {
                let status = if undeletable.contains(&id.0) {
                    "error"
                } else {
                    rows.remove(&id.0);
                    "success"
                };
                DeleteOutcome {
                    remote_id: id.0.clone(),
                    status: status.to_string(),
                }
            })
            .collect();
        Ok(BatchDeleteResponse {
            success: true,
            results: Some(results),
            message: None,
        })
    }

    fn delete_row(&self, request: &DeleteRowRequest) -> Result<DeleteRowResponse, RemoteError> {
        self.calls.borrow_mut().push("delete");
        let removed = self.rows.borrow_mut().remove(&request.remote_id.0).is_some();
        Ok(DeleteRowResponse {
            success: removed,
            message: (!removed).then(|| "no such row".to_string()),
        })
    }

    fn send_changes(
        &self,
        request: &ChangeBatchRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        self.calls.borrow_mut().push("changes");
        if let Some(code) = *self.fail_changes.borrow() {
            return Err(RemoteError::Status {
                code,
                body: "unavailable".to_string(),
            });
        }
        let mut rows = self.rows.borrow_mut();
        for record in &request.records {
            match (record.operation, &record.data) {
                (ChangeKind::Deleted, _) => {
                    rows.remove(&record.unique_id.0);
                }
                (_, Some(data)) => {
                    rows.insert(record.unique_id.0.clone(), data.clone());
                }
                (_, None) => {}
            }
        }
        Ok(serde_json::json!({ "success": true, "processed": request.records.len() }))
    }
}
