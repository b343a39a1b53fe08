//! Remote endpoint: wire types, the [`RemoteApi`] seam, and the blocking
//! `ureq` client.
//!
//! Every request is a JSON POST to one endpoint. Hub operations are tagged by
//! `operation`; the combined change request is a bare `{ records: [...] }`.
//! Any non-2xx status is a delivery failure.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use rallysync_core::{
    Change, ChangeKind, EventFields, FieldDelta, RemoteId, RowPosition, SyncConfig, UniqueId,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a remote call did not deliver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Non-2xx response.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body could not be parsed or lacked a required field.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The endpoint answered `success: false`.
    #[error("remote reported failure: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `metadata` block carried by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub timestamp: String,
    pub source: String,
    pub source_position: Option<usize>,
}

impl RequestMetadata {
    pub fn now(source: &str, position: Option<RowPosition>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            source: source.to_string(),
            source_position: position.map(|p| p.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRowRequest {
    pub unique_id: UniqueId,
    pub data: EventFields,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub remote_ids: Vec<RemoteId>,
    pub metadata: RequestMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRowRequest {
    pub remote_id: RemoteId,
    pub source_position: Option<usize>,
    pub metadata: RequestMetadata,
}

/// Hub operations, tagged on the wire by `operation`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation")]
pub enum HubRequest<'a> {
    #[serde(rename = "CREATE_HUBDB_ROW")]
    CreateRow(&'a CreateRowRequest),
    #[serde(rename = "BATCH_DELETE_HUBDB_ROWS")]
    BatchDelete(&'a BatchDeleteRequest),
    #[serde(rename = "DELETE_HUBDB_ROW")]
    DeleteRow(&'a DeleteRowRequest),
}

/// One entry of the combined individual-operations request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub operation: ChangeKind,
    pub unique_id: UniqueId,
    pub data: Option<EventFields>,
    pub old_data: Option<EventFields>,
    pub changed_fields: Vec<FieldDelta>,
    pub metadata: RequestMetadata,
}

impl ChangeRecord {
    pub fn from_change(change: &Change, source: &str) -> Self {
        let metadata = RequestMetadata::now(source, change.status_row());
        match change {
            Change::New { unique_id, record } => Self {
                operation: ChangeKind::New,
                unique_id: unique_id.clone(),
                data: Some(record.fields.clone()),
                old_data: None,
                changed_fields: Vec::new(),
                metadata,
            },
            Change::Updated {
                unique_id,
                record,
                previous,
                changed_fields,
            } => Self {
                operation: ChangeKind::Updated,
                unique_id: unique_id.clone(),
                data: Some(record.fields.clone()),
                old_data: Some(previous.fields.clone()),
                changed_fields: changed_fields.clone(),
                metadata,
            },
            Change::Deleted {
                unique_id, previous, ..
            } => Self {
                operation: ChangeKind::Deleted,
                unique_id: unique_id.clone(),
                data: None,
                old_data: Some(previous.fields.clone()),
                changed_fields: Vec::new(),
                metadata,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeBatchRequest {
    pub records: Vec<ChangeRecord>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRowResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_id")]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CreateRowResponse {
    /// The new identity, or why there is none.
    pub fn into_remote_id(self) -> Result<RemoteId, RemoteError> {
        if !self.success {
            return Err(RemoteError::Rejected(
                self.message.unwrap_or_else(|| "create failed".to_string()),
            ));
        }
        self.remote_id
            .filter(|id| !id.trim().is_empty())
            .map(|id| RemoteId::from(id.trim()))
            .ok_or_else(|| RemoteError::Malformed("success without remoteId".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    #[serde(deserialize_with = "required_id")]
    pub remote_id: String,
    pub status: String,
}

impl DeleteOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<DeleteOutcome>>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BatchDeleteResponse {
    /// Per-id outcomes. Overall failure or a missing `results` list means the
    /// batch as a whole did not deliver.
    pub fn into_outcomes(self) -> Result<Vec<DeleteOutcome>, RemoteError> {
        if !self.success {
            return Err(RemoteError::Rejected(
                self.message
                    .unwrap_or_else(|| "batch delete failed".to_string()),
            ));
        }
        self.results
            .ok_or_else(|| RemoteError::Malformed("batch delete without results".to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRowResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeleteRowResponse {
    pub fn into_result(self) -> Result<(), RemoteError> {
        if self.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected(
                self.message.unwrap_or_else(|| "delete failed".to_string()),
            ))
        }
    }
}

/// Remote ids may arrive as JSON strings or numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_id(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("remoteId must be a string or number"))
}

// ---------------------------------------------------------------------------
// Seam
// ---------------------------------------------------------------------------

/// The remote store as the engine sees it. Implementations return transport
/// level failures as `Err`; `success: false` bodies come back as `Ok` and are
/// interpreted by the caller.
pub trait RemoteApi {
    fn create_row(&self, request: &CreateRowRequest) -> Result<CreateRowResponse, RemoteError>;

    fn batch_delete(
        &self,
        request: &BatchDeleteRequest,
    ) -> Result<BatchDeleteResponse, RemoteError>;

    fn delete_row(&self, request: &DeleteRowRequest) -> Result<DeleteRowResponse, RemoteError>;

    /// Send the combined individual-operations request; the response JSON is
    /// passed through untouched.
    fn send_changes(&self, request: &ChangeBatchRequest)
        -> Result<serde_json::Value, RemoteError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking JSON-over-HTTP [`RemoteApi`].
#[derive(Debug, Clone)]
pub struct HttpRemote {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.endpoint.trim(), config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<String, RemoteError> {
        let payload = serde_json::to_string(body)
            .map_err(|e| RemoteError::Malformed(format!("request encoding: {e}")))?;
        tracing::debug!("POST {} ({} bytes)", self.endpoint, payload.len());

        let response = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&payload)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(RemoteError::Status {
                    code,
                    body: response.into_string().unwrap_or_default(),
                });
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(RemoteError::Transport(err.to_string()));
            }
        };

        let code = response.status();
        let body = response
            .into_string()
            .map_err(|e| RemoteError::Transport(format!("reading response body: {e}")))?;
        if !(200..300).contains(&code) {
            return Err(RemoteError::Status { code, body });
        }
        Ok(body)
    }
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|e| RemoteError::Malformed(format!("{e}: {body}")))
}

impl RemoteApi for HttpRemote {
    fn create_row(&self, request: &CreateRowRequest) -> Result<CreateRowResponse, RemoteError> {
        parse_body(&self.post(&HubRequest::CreateRow(request))?)
    }

    fn batch_delete(
        &self,
        request: &BatchDeleteRequest,
    ) -> Result<BatchDeleteResponse, RemoteError> {
        parse_body(&self.post(&HubRequest::BatchDelete(request))?)
    }

    fn delete_row(&self, request: &DeleteRowRequest) -> Result<DeleteRowResponse, RemoteError> {
        parse_body(&self.post(&HubRequest::DeleteRow(request))?)
    }

    fn send_changes(
        &self,
        request: &ChangeBatchRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        let body = self.post(request)?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        parse_body(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
