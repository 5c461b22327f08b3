use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by ingestion, classification and the REST surface
#[derive(Error, Debug)]
pub enum HibiscusError {
  /// Malformed input: missing spreadsheet column, unmapped code, out-of-range value
  #[error("Validation failed for {field}: {message}")]
  Validation { field: String, message: String },

  /// Index or title absent
  #[error("Not found: {what}")]
  NotFound { what: String },

  /// Title already present in the target column
  #[error("Conflict: {what}")]
  Conflict { what: String },

  /// Embedding service or vector store call failed
  #[error("{service} unavailable: {message}")]
  UpstreamUnavailable { service: &'static str, message: String },

  /// Configuration could not be loaded or is invalid
  #[error("Configuration error at {path}: {message}")]
  Config { path: String, message: String },

  #[error("IO error: {context}: {source}")]
  Io {
    source: std::io::Error,
    context: String,
  },

  #[error("Configuration file not found: {path}")]
  ConfigNotFound { path: PathBuf },

  #[error(transparent)]
  Internal(#[from] anyhow::Error),
}

impl HibiscusError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation { field: field.into(), message: message.into() }
  }

  pub fn not_found(what: impl Into<String>) -> Self {
    Self::NotFound { what: what.into() }
  }

  pub fn conflict(what: impl Into<String>) -> Self {
    Self::Conflict { what: what.into() }
  }

  pub fn embedding_unavailable(message: impl Into<String>) -> Self {
    Self::UpstreamUnavailable { service: "embedding service", message: message.into() }
  }

  pub fn store_unavailable(message: impl Into<String>) -> Self {
    Self::UpstreamUnavailable { service: "vector store", message: message.into() }
  }

  pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Config { path: path.into(), message: message.into() }
  }

  pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
    Self::Io { source, context: context.into() }
  }

  /// Stable key used in API error payloads and logs
  pub fn key(&self) -> &'static str {
    match self {
      Self::Validation { .. } => "validation_error",
      Self::NotFound { .. } => "not_found",
      Self::Conflict { .. } => "conflict",
      Self::UpstreamUnavailable { .. } => "upstream_unavailable",
      Self::Config { .. } | Self::ConfigNotFound { .. } => "config_error",
      Self::Io { .. } | Self::Internal(_) => "internal_error",
    }
  }
}

/// Result type for hibiscus operations
pub type Result<T> = std::result::Result<T, HibiscusError>;
