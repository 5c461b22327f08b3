//! Vector store abstraction for the attribute partition index
//!
//! The classifier and ingestion code only talk to [`VectorStore`], so the
//! backing engine (LanceDB in production, an in-memory map in tests) can be
//! swapped without touching either.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata carried by every stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordMetadata {
  /// Species title the record describes
  pub title: String,
  /// Attribute column the record belongs to
  pub column: String,
  /// Embedded text (label string or attribute name)
  pub text: String,
  /// Lower bound for range attributes
  #[serde(skip_serializing_if = "Option::is_none")]
  pub min: Option<f64>,
  /// Upper bound for range attributes
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max: Option<f64>,
}

/// A unit stored in the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
  pub id: String,
  pub embedding: Vec<f32>,
  pub metadata: RecordMetadata,
}

impl IndexRecord {
  /// Deterministic record id so re-ingesting a title overwrites its chunks
  pub fn record_id(column: &str, title: &str, chunk_index: usize) -> String {
    format!("{column}:{title}:{chunk_index}")
  }
}

/// One hit returned by a store query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StoreMatch {
  pub id: String,
  /// Similarity score, higher is more similar
  pub score: f32,
  pub metadata: RecordMetadata,
}

/// Metadata predicate; every present clause must hold
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
  pub title: Option<String>,
  pub column: Option<String>,
  /// Keep records whose `[min, max]` interval contains this value
  pub contains: Option<f64>,
}

impl MetadataFilter {
  pub fn by_title(title: &str) -> Self {
    Self { title: Some(title.to_string()), ..Default::default() }
  }

  pub fn by_column(column: &str) -> Self {
    Self { column: Some(column.to_string()), ..Default::default() }
  }

  pub fn containing(mut self, value: f64) -> Self {
    self.contains = Some(value);
    self
  }

  pub fn and_title(mut self, title: &str) -> Self {
    self.title = Some(title.to_string());
    self
  }

  /// Evaluate directly against record metadata
  pub fn matches(&self, metadata: &RecordMetadata) -> bool {
    let title_ok = self.title.as_deref().is_none_or(|title| metadata.title == title);
    let column_ok = self.column.as_deref().is_none_or(|column| metadata.column == column);
    let range_ok = self.contains.is_none_or(|value| match (metadata.min, metadata.max) {
      (Some(min), Some(max)) => min <= value && max >= value,
      _ => false,
    });
    title_ok && column_ok && range_ok
  }

  /// Render as a SQL predicate over the LanceDB table columns
  pub fn to_sql(&self) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(title) = &self.title {
      clauses.push(format!("title = '{}'", escape_sql(title)));
    }
    if let Some(column) = &self.column {
      clauses.push(format!("attribute = '{}'", escape_sql(column)));
    }
    if let Some(value) = self.contains {
      clauses.push(format!("min_value <= {value} AND max_value >= {value}"));
    }

    if clauses.is_empty() {
      None
    } else {
      Some(clauses.join(" AND "))
    }
  }
}

fn escape_sql(value: &str) -> String {
  value.replace('\'', "''")
}

/// A filtered similarity (or metadata-only) query
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
  /// `None` scans by metadata only; matches then carry score 0
  pub vector: Option<Vec<f32>>,
  pub filter: MetadataFilter,
  pub top_k: usize,
}

/// Vector store capability consumed by ingestion and classification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Names of the indexes that currently exist
  async fn list_indexes(&self) -> Result<Vec<String>>;

  /// Insert or replace records by id
  async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<()>;

  /// Matches ordered by descending score, at most `top_k`
  async fn query(&self, index: &str, query: StoreQuery) -> Result<Vec<StoreMatch>>;

  /// Remove records by id, returning how many existed
  async fn delete(&self, index: &str, ids: &[String]) -> Result<usize>;
}
