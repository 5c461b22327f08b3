//! LanceDB-backed vector store
//!
//! Each index is a LanceDB table under the configured data directory.
//! Failures from LanceDB are surfaced as vector store outages.

pub mod connection;
pub mod records;
pub mod search;
pub mod table_manager;

use async_trait::async_trait;
use std::path::Path;

use crate::error::{HibiscusError, Result};
use crate::server::services::vector_database::{IndexRecord, StoreMatch, StoreQuery, VectorStore};
use connection::create_connection;
use table_manager::TableManager;

pub struct LanceDbStore {
  table_manager: TableManager,
}

impl LanceDbStore {
  /// Connect to (or create) the store at `data_dir`
  pub async fn open(data_dir: &Path, dimension: usize) -> Result<Self> {
    let connection = create_connection(data_dir).await.map_err(unavailable)?;
    Ok(Self { table_manager: TableManager::new(connection, dimension) })
  }

  /// Create any missing index tables
  pub async fn ensure_indexes(&self, names: &[String]) -> Result<()> {
    for name in names {
      self.table_manager.ensure_table(name).await.map_err(unavailable)?;
    }
    Ok(())
  }

  async fn require_index(&self, index: &str) -> Result<()> {
    if self.table_manager.table_exists(index).await.map_err(unavailable)? {
      Ok(())
    } else {
      Err(HibiscusError::store_unavailable(format!("index '{index}' does not exist")))
    }
  }
}

fn unavailable(err: anyhow::Error) -> HibiscusError {
  HibiscusError::store_unavailable(format!("{err:#}"))
}

#[async_trait]
impl VectorStore for LanceDbStore {
  async fn list_indexes(&self) -> Result<Vec<String>> {
    let mut names = self.table_manager.table_names().await.map_err(unavailable)?;
    names.sort();
    Ok(names)
  }

  async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<()> {
    self.require_index(index).await?;
    self.table_manager.merge_records(index, records).await.map_err(unavailable)
  }

  async fn query(&self, index: &str, query: StoreQuery) -> Result<Vec<StoreMatch>> {
    self.require_index(index).await?;
    let table = self.table_manager.get_table(index).await.map_err(unavailable)?;
    search::run_query(&table, &query).await.map_err(unavailable)
  }

  async fn delete(&self, index: &str, ids: &[String]) -> Result<usize> {
    self.require_index(index).await?;
    self.table_manager.delete_ids(index, ids).await.map_err(unavailable)
  }
}
