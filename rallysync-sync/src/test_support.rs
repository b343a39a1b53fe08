//! Scripted in-process [`RemoteApi`] for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::remote::{
    parse_body, BatchDeleteRequest, BatchDeleteResponse, ChangeBatchRequest, CreateRowRequest,
    CreateRowResponse, DeleteRowRequest, DeleteRowResponse, RemoteApi, RemoteError,
};

type Scripted = Result<&'static str, RemoteError>;

/// Answers from per-operation queues; an empty queue answers with success
/// (creates get `auto-<n>` ids, batches report every id deleted).
#[derive(Default)]
pub(crate) struct FakeRemote {
    create: RefCell<VecDeque<Scripted>>,
    batch: RefCell<VecDeque<Scripted>>,
    delete: RefCell<VecDeque<Scripted>>,
    changes: RefCell<VecDeque<Result<serde_json::Value, RemoteError>>>,
    creates: RefCell<Vec<CreateRowRequest>>,
    batches: RefCell<Vec<BatchDeleteRequest>>,
    deletes: RefCell<Vec<DeleteRowRequest>>,
    change_batches: RefCell<Vec<ChangeBatchRequest>>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script_create(&self, answer: Scripted) {
        self.create.borrow_mut().push_back(answer);
    }

    pub(crate) fn script_batch(&self, answer: Scripted) {
        self.batch.borrow_mut().push_back(answer);
    }

    pub(crate) fn script_delete(&self, answer: Scripted) {
        self.delete.borrow_mut().push_back(answer);
    }

    pub(crate) fn script_changes(&self, answer: Result<serde_json::Value, RemoteError>) {
        self.changes.borrow_mut().push_back(answer);
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.creates.borrow().len()
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batches.borrow().len()
    }

    pub(crate) fn delete_requests(&self) -> Vec<DeleteRowRequest> {
        self.deletes.borrow().clone()
    }

    pub(crate) fn change_batches(&self) -> Vec<ChangeBatchRequest> {
        self.change_batches.borrow().clone()
    }
}

impl RemoteApi for FakeRemote {
    fn create_row(&self, request: &CreateRowRequest) -> Result<CreateRowResponse, RemoteError> {
        self.creates.borrow_mut().push(request.clone());
        match self.create.borrow_mut().pop_front() {
            Some(answer) => parse_body(answer?),
            None => Ok(CreateRowResponse {
                success: true,
                remote_id: Some(format!("auto-{}", self.creates.borrow().len())),
                message: None,
            }),
        }
    }

    fn batch_delete(
        &self,
        request: &BatchDeleteRequest,
    ) -> Result<BatchDeleteResponse, RemoteError> {
        self.batches.borrow_mut().push(request.clone());
        match self.batch.borrow_mut().pop_front() {
            Some(answer) => parse_body(answer?),
            None => {
                let results: Vec<_> = request
                    .remote_ids
                    .iter()
                    .map(|id| serde_json::json!({"remoteId": id.0, "status": "success"}))
                    .collect();
                parse_body(&serde_json::json!({"success": true, "results": results}).to_string())
            }
        }
    }

    fn delete_row(&self, request: &DeleteRowRequest) -> Result<DeleteRowResponse, RemoteError> {
        self.deletes.borrow_mut().push(request.clone());
        match self.delete.borrow_mut().pop_front() {
            Some(answer) => parse_body(answer?),
            None => Ok(DeleteRowResponse {
                success: true,
                message: None,
            }),
        }
    }

    fn send_changes(
        &self,
        request: &ChangeBatchRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        self.change_batches.borrow_mut().push(request.clone());
        self.changes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(serde_json::json!({"ok": true})))
    }
}
