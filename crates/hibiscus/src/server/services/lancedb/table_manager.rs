//! Table management operations for LanceDB
//!
//! Every index is one LanceDB table sharing the schema from
//! [`super::records::index_schema`].

use anyhow::{anyhow, Result};
use arrow::record_batch::RecordBatchIterator;
use lancedb::{Connection, Table};

use super::records::{index_schema, records_to_arrow_batch};
use crate::server::services::vector_database::IndexRecord;

pub struct TableManager {
  connection: Connection,
  dimension: usize,
}

impl TableManager {
  pub fn new(connection: Connection, dimension: usize) -> Self {
    Self { connection, dimension }
  }

  pub async fn table_names(&self) -> Result<Vec<String>> {
    self
      .connection
      .table_names()
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to list tables: {}", e))
  }

  pub async fn table_exists(&self, name: &str) -> Result<bool> {
    Ok(self.table_names().await?.iter().any(|table| table == name))
  }

  pub async fn get_table(&self, name: &str) -> Result<Table> {
    self
      .connection
      .open_table(name)
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to open table '{}': {}", name, e))
  }

  /// Create an empty table for the index if it is missing
  pub async fn ensure_table(&self, name: &str) -> Result<bool> {
    if self.table_exists(name).await? {
      return Ok(false);
    }

    self
      .connection
      .create_empty_table(name, index_schema(self.dimension))
      .execute()
      .await
      .map_err(|e| anyhow!("Failed to create table '{}': {}", name, e))?;

    bentley::info!("Created index table '{name}' ({} dimensions)", self.dimension);
    Ok(true)
  }

  /// Insert or replace records, keyed by id
  pub async fn merge_records(&self, name: &str, records: &[IndexRecord]) -> Result<()> {
    if records.is_empty() {
      return Ok(());
    }

    let batch = records_to_arrow_batch(records, self.dimension)?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    let table = self.get_table(name).await?;
    let mut merge = table.merge_insert(&["id"]);
    merge.when_matched_update_all(None).when_not_matched_insert_all();
    merge
      .execute(Box::new(batch_iter))
      .await
      .map_err(|e| anyhow!("Failed to upsert {} records into '{}': {}", records.len(), name, e))?;

    bentley::verbose!("Upserted {} records into '{name}'", records.len());
    Ok(())
  }

  /// Delete records by id, returning how many matched
  pub async fn delete_ids(&self, name: &str, ids: &[String]) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }

    let table = self.get_table(name).await?;
    let predicate = id_predicate(ids);
    let count = table.count_rows(Some(predicate.clone())).await?;

    table.delete(&predicate).await.map_err(|e| anyhow!("Failed to delete records: {}", e))?;

    Ok(count)
  }
}

fn id_predicate(ids: &[String]) -> String {
  let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect();
  format!("id IN ({})", quoted.join(", "))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_id_predicate_quotes_each_id() {
    let ids = vec!["잎끝:a:0".to_string(), "잎끝:b's:1".to_string()];
    assert_eq!(id_predicate(&ids), "id IN ('잎끝:a:0', '잎끝:b''s:1')");
  }
}
