//! Administrative record lookups and bulk deletion

use std::sync::Arc;

use crate::error::{HibiscusError, Result};
use crate::server::services::vector_database::{MetadataFilter, StoreMatch, StoreQuery, VectorStore};

/// Default cap on records returned by a metadata scan
pub const DEFAULT_ADMIN_LIMIT: usize = 10_000;

pub struct RecordAdmin {
  store: Arc<dyn VectorStore>,
  limit: usize,
}

impl RecordAdmin {
  pub fn new(store: Arc<dyn VectorStore>, limit: usize) -> Self {
    Self { store, limit }
  }

  /// Every record stored for a title, across all columns
  pub async fn query_by_title(&self, index: &str, title: &str) -> Result<Vec<StoreMatch>> {
    self.ensure_index(index).await?;
    self.scan(index, MetadataFilter::by_title(title.trim())).await
  }

  /// Delete every record tagged with a column, returning the count removed
  pub async fn delete_by_column(&self, index: &str, column: &str) -> Result<usize> {
    self.ensure_index(index).await?;

    let matches = self.scan(index, MetadataFilter::by_column(column.trim())).await?;
    let ids: Vec<String> = matches.into_iter().map(|m| m.id).collect();
    if ids.is_empty() {
      return Ok(0);
    }

    let removed = self.store.delete(index, &ids).await?;
    bentley::info!("Deleted {removed} record(s) from column '{}' in '{index}'", column.trim());
    Ok(removed)
  }

  async fn scan(&self, index: &str, filter: MetadataFilter) -> Result<Vec<StoreMatch>> {
    self.store.query(index, StoreQuery { vector: None, filter, top_k: self.limit }).await
  }

  async fn ensure_index(&self, index: &str) -> Result<()> {
    if self.store.list_indexes().await?.iter().any(|name| name == index) {
      Ok(())
    } else {
      Err(HibiscusError::not_found(format!("index '{index}'")))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::memory::InMemoryStore;
  use crate::server::services::vector_database::{IndexRecord, RecordMetadata};

  fn record(title: &str, column: &str) -> IndexRecord {
    IndexRecord {
      id: IndexRecord::record_id(column, title, 0),
      embedding: vec![1.0],
      metadata: RecordMetadata {
        title: title.to_string(),
        column: column.to_string(),
        text: column.to_string(),
        min: None,
        max: None,
      },
    }
  }

  async fn seeded() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    store
      .upsert(
        "classify",
        &[record("찰피나무", "잎끝"), record("찰피나무", "톱니"), record("잣나무", "잎끝")],
      )
      .await
      .unwrap();
    store
  }

  #[tokio::test]
  async fn test_query_by_title_returns_all_columns() {
    let admin = RecordAdmin::new(seeded().await, DEFAULT_ADMIN_LIMIT);
    let matches = admin.query_by_title("classify", "찰피나무").await.unwrap();

    let columns: Vec<_> = matches.iter().map(|m| m.metadata.column.as_str()).collect();
    assert_eq!(columns, vec!["잎끝", "톱니"]);
  }

  #[tokio::test]
  async fn test_delete_by_column_counts_removed() {
    let store = seeded().await;
    let admin = RecordAdmin::new(store.clone(), DEFAULT_ADMIN_LIMIT);

    assert_eq!(admin.delete_by_column("classify", "잎끝").await.unwrap(), 2);
    assert_eq!(admin.delete_by_column("classify", "잎끝").await.unwrap(), 0);
    assert_eq!(store.len("classify").await, 1);
  }

  #[tokio::test]
  async fn test_missing_index_is_not_found() {
    let admin = RecordAdmin::new(seeded().await, DEFAULT_ADMIN_LIMIT);
    let err = admin.query_by_title("other", "찰피나무").await.unwrap_err();
    assert!(matches!(err, HibiscusError::NotFound { .. }));
  }
}
