//! REST API types with schemars annotations for OpenAPI generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::server::services::ingestion::{Sheet, DEFAULT_INDEX};
use crate::server::services::vector_database::StoreMatch;

// Base Response Structure
// ======================

/// Envelope returned by every endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResponseDto<T> {
  /// Whether the request succeeded
  pub success: bool,

  /// Human readable outcome
  pub message: String,

  /// Endpoint payload (`null` on errors)
  pub data: T,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,
}

impl<T> ResponseDto<T> {
  /// Create a successful response
  pub fn success(message: impl Into<String>, data: T, transaction_id: Uuid) -> Self {
    Self { success: true, message: message.into(), data, transaction_id }
  }
}

impl ResponseDto<()> {
  /// Create an error response
  pub fn error(message: impl Into<String>, transaction_id: Uuid) -> Self {
    Self { success: false, message: message.into(), data: (), transaction_id }
  }
}

fn default_index() -> String {
  DEFAULT_INDEX.to_string()
}

// Status/Version Endpoints
// =======================

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  /// Service health
  pub status: String,

  /// Running version
  pub version: String,

  /// Indexes currently present in the vector store
  pub indexes: Vec<String>,
}

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

// Logs Endpoint
// =============

/// Query for /logs endpoint
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogsQuery {
  /// Newest entries to return (default 100)
  pub limit: Option<usize>,

  /// Only entries at this level
  pub level: Option<String>,
}

/// Response for /logs endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  /// JSON log entries, oldest first
  pub logs: Vec<LogEntry>,
}

/// Individual log entry (re-exported from bentley)
pub type LogEntry = bentley::daemon_logs::LogEntry;

// Record Endpoints
// ================

/// Response for single record creation
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateRecordResponse {
  /// Records written to the index
  pub records: usize,
}

/// Request body for the spreadsheet upload endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SheetUploadRequest {
  /// Target index
  #[serde(default = "default_index")]
  pub index: String,

  /// Sheet rows keyed by column header
  pub rows: Vec<BTreeMap<String, Value>>,
}

impl SheetUploadRequest {
  pub fn into_parts(self) -> (String, Sheet) {
    (self.index, Sheet { rows: self.rows })
  }
}

/// Query for /pinecone/queryWithTitle
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TitleQuery {
  /// Species title
  pub title: String,

  /// Target index
  #[serde(default = "default_index")]
  pub index: String,
}

/// Response for /pinecone/queryWithTitle
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TitleRecordsResponse {
  /// Species title
  pub title: String,

  /// Stored records for the title
  pub records: Vec<StoreMatch>,
}

/// Query for /pinecone/deleteColumn
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ColumnQuery {
  /// Attribute column name
  pub column: String,

  /// Target index
  #[serde(default = "default_index")]
  pub index: String,
}

/// Response for /pinecone/deleteColumn
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteColumnResponse {
  /// Attribute column name
  pub column: String,

  /// Records removed
  pub deleted: usize,
}
