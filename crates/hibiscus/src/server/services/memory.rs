//! In-memory vector store using cosine similarity
//!
//! Records are kept per index in insertion order behind a
//! `tokio::sync::RwLock`, so equal scores come back in the order they were
//! stored. Suitable for tests and `--memory` development runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{HibiscusError, Result};
use crate::server::services::vector_database::{IndexRecord, StoreMatch, StoreQuery, VectorStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
  indexes: RwLock<HashMap<String, Vec<IndexRecord>>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store with the given (empty) indexes already created
  pub fn with_indexes<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let indexes = names.into_iter().map(|name| (name.into(), Vec::new())).collect();
    Self { indexes: RwLock::new(indexes) }
  }

  /// Number of records in an index (0 when absent)
  pub async fn len(&self, index: &str) -> usize {
    self.indexes.read().await.get(index).map(Vec::len).unwrap_or(0)
  }
}

fn missing_index(index: &str) -> HibiscusError {
  HibiscusError::store_unavailable(format!("index '{index}' does not exist"))
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }
  dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
  async fn list_indexes(&self) -> Result<Vec<String>> {
    let mut names: Vec<String> = self.indexes.read().await.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<()> {
    let mut indexes = self.indexes.write().await;
    let stored = indexes.get_mut(index).ok_or_else(|| missing_index(index))?;

    for record in records {
      match stored.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record.clone(),
        None => stored.push(record.clone()),
      }
    }
    Ok(())
  }

  async fn query(&self, index: &str, query: StoreQuery) -> Result<Vec<StoreMatch>> {
    let indexes = self.indexes.read().await;
    let stored = indexes.get(index).ok_or_else(|| missing_index(index))?;

    let mut matches: Vec<StoreMatch> = stored
      .iter()
      .filter(|record| query.filter.matches(&record.metadata))
      .map(|record| StoreMatch {
        id: record.id.clone(),
        score: query
          .vector
          .as_deref()
          .map(|v| cosine_similarity(&record.embedding, v))
          .unwrap_or(0.0),
        metadata: record.metadata.clone(),
      })
      .collect();

    // Stable: ties keep insertion order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(query.top_k);
    Ok(matches)
  }

  async fn delete(&self, index: &str, ids: &[String]) -> Result<usize> {
    let mut indexes = self.indexes.write().await;
    let stored = indexes.get_mut(index).ok_or_else(|| missing_index(index))?;

    let before = stored.len();
    stored.retain(|record| !ids.contains(&record.id));
    Ok(before - stored.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::vector_database::{MetadataFilter, RecordMetadata};

  fn record(
    id: &str,
    title: &str,
    column: &str,
    embedding: Vec<f32>,
    range: Option<(f64, f64)>,
  ) -> IndexRecord {
    IndexRecord {
      id: id.to_string(),
      embedding,
      metadata: RecordMetadata {
        title: title.to_string(),
        column: column.to_string(),
        text: column.to_string(),
        min: range.map(|r| r.0),
        max: range.map(|r| r.1),
      },
    }
  }

  #[test]
  fn test_cosine_similarity() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
  }

  #[tokio::test]
  async fn test_upsert_replaces_by_id() {
    let store = InMemoryStore::with_indexes(["classify"]);
    store.upsert("classify", &[record("a", "찰피나무", "톱니", vec![1.0, 0.0], None)]).await.unwrap();
    store.upsert("classify", &[record("a", "잣나무", "톱니", vec![0.0, 1.0], None)]).await.unwrap();

    assert_eq!(store.len("classify").await, 1);
    let all = store
      .query("classify", StoreQuery { vector: None, filter: MetadataFilter::default(), top_k: 10 })
      .await
      .unwrap();
    assert_eq!(all[0].metadata.title, "잣나무");
  }

  #[tokio::test]
  async fn test_query_orders_by_score_and_truncates() {
    let store = InMemoryStore::with_indexes(["classify"]);
    store
      .upsert(
        "classify",
        &[
          record("far", "잣나무", "잎끝", vec![0.0, 1.0], None),
          record("near", "찰피나무", "잎끝", vec![1.0, 0.1], None),
          record("other", "소나무", "잎날", vec![1.0, 0.0], None),
        ],
      )
      .await
      .unwrap();

    let matches = store
      .query(
        "classify",
        StoreQuery {
          vector: Some(vec![1.0, 0.0]),
          filter: MetadataFilter::by_column("잎끝"),
          top_k: 1,
        },
      )
      .await
      .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "near");
  }

  #[tokio::test]
  async fn test_range_query_only_returns_containing_intervals() {
    let store = InMemoryStore::with_indexes(["classify"]);
    store
      .upsert(
        "classify",
        &[
          record("a", "찰피나무", "잎길이", vec![1.0], Some((10.0, 15.0))),
          record("b", "잣나무", "잎길이", vec![1.0], Some((3.0, 8.0))),
          record("c", "소나무", "잎길이", vec![1.0], Some((12.0, 20.0))),
        ],
      )
      .await
      .unwrap();

    let matches = store
      .query(
        "classify",
        StoreQuery {
          vector: Some(vec![1.0]),
          filter: MetadataFilter::by_column("잎길이").containing(12.0),
          top_k: 5,
        },
      )
      .await
      .unwrap();

    let titles: Vec<_> = matches.iter().map(|m| m.metadata.title.as_str()).collect();
    assert_eq!(titles, vec!["찰피나무", "소나무"]);
  }

  #[tokio::test]
  async fn test_delete_counts_removed_records() {
    let store = InMemoryStore::with_indexes(["classify"]);
    store.upsert("classify", &[record("a", "x", "톱니", vec![1.0], None)]).await.unwrap();

    let ids = ["a".to_string(), "missing".to_string()];
    let removed = store.delete("classify", &ids).await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.len("classify").await, 0);
  }

  #[tokio::test]
  async fn test_missing_index_is_an_error() {
    let store = InMemoryStore::new();
    let result = store.upsert("nope", &[]).await;
    assert!(result.is_err());
  }
}
