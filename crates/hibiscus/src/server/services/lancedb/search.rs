//! Filtered vector search and metadata scans over an index table

use anyhow::{anyhow, Result};
use arrow::array::{Array, Float32Array, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use futures::stream::{Stream, StreamExt};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use crate::server::services::vector_database::{RecordMetadata, StoreMatch, StoreQuery};

/// Run a store query against one table
///
/// With a vector this is a cosine similarity search restricted by the
/// metadata filter. Without one it is a plain filtered scan.
pub async fn run_query(table: &Table, query: &StoreQuery) -> Result<Vec<StoreMatch>> {
  if query.top_k == 0 {
    return Ok(Vec::new());
  }

  let predicate = query.filter.to_sql();
  let mut matches = match &query.vector {
    Some(vector) => {
      let mut search = table
        .vector_search(vector.as_slice())?
        .column("embedding")
        .distance_type(DistanceType::Cosine)
        .limit(query.top_k);
      if let Some(predicate) = &predicate {
        search = search.only_if(predicate.clone());
      }
      let mut stream = search.execute().await.map_err(|e| anyhow!("Vector search failed: {}", e))?;
      process_all_batches(&mut stream).await?
    }
    None => {
      let mut scan = table.query().limit(query.top_k);
      if let Some(predicate) = &predicate {
        scan = scan.only_if(predicate.clone());
      }
      let mut stream = scan.execute().await.map_err(|e| anyhow!("Metadata scan failed: {}", e))?;
      process_all_batches(&mut stream).await?
    }
  };

  matches.sort_by(|a, b| b.score.total_cmp(&a.score));
  matches.truncate(query.top_k);

  if matches.is_empty() {
    bentley::verbose!("No records matched filter {:?}", predicate);
  }
  Ok(matches)
}

async fn process_all_batches(
  stream: &mut (impl Stream<Item = Result<RecordBatch, lancedb::Error>> + Unpin),
) -> Result<Vec<StoreMatch>> {
  let mut matches = Vec::new();

  while let Some(batch_result) = stream.next().await {
    let batch = batch_result.map_err(|e| anyhow!("Error reading batch: {}", e))?;
    matches.extend(process_result_batch(&batch)?);
  }

  Ok(matches)
}

/// Column arrays pulled out of one result batch
struct BatchColumnArrays<'a> {
  id: &'a StringArray,
  title: &'a StringArray,
  attribute: &'a StringArray,
  text: &'a StringArray,
  min_value: &'a Float64Array,
  max_value: &'a Float64Array,
  distance: Option<&'a Float32Array>,
}

fn process_result_batch(batch: &RecordBatch) -> Result<Vec<StoreMatch>> {
  let columns = extract_column_arrays(batch)?;

  Ok((0..batch.num_rows()).map(|row| match_from_row(&columns, row)).collect())
}

fn extract_column_arrays(batch: &RecordBatch) -> Result<BatchColumnArrays<'_>> {
  Ok(BatchColumnArrays {
    id: extract_column::<StringArray>(batch, "id")?,
    title: extract_column::<StringArray>(batch, "title")?,
    attribute: extract_column::<StringArray>(batch, "attribute")?,
    text: extract_column::<StringArray>(batch, "text")?,
    min_value: extract_column::<Float64Array>(batch, "min_value")?,
    max_value: extract_column::<Float64Array>(batch, "max_value")?,
    distance: batch
      .column_by_name("_distance")
      .and_then(|col| col.as_any().downcast_ref::<Float32Array>()),
  })
}

fn extract_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
  batch
    .column_by_name(name)
    .ok_or_else(|| anyhow!("Missing '{}' column", name))?
    .as_any()
    .downcast_ref::<T>()
    .ok_or_else(|| anyhow!("Unexpected type for '{}' column", name))
}

fn optional_value(array: &Float64Array, row: usize) -> Option<f64> {
  if array.is_null(row) {
    None
  } else {
    Some(array.value(row))
  }
}

fn match_from_row(columns: &BatchColumnArrays<'_>, row: usize) -> StoreMatch {
  let score = match columns.distance {
    Some(distance) if !distance.is_null(row) => distance_to_similarity(distance.value(row)),
    _ => 0.0,
  };

  StoreMatch {
    id: columns.id.value(row).to_string(),
    score,
    metadata: RecordMetadata {
      title: columns.title.value(row).to_string(),
      column: columns.attribute.value(row).to_string(),
      text: columns.text.value(row).to_string(),
      min: optional_value(columns.min_value, row),
      max: optional_value(columns.max_value, row),
    },
  }
}

/// Cosine distance is `1 - cos`, so invert it back into a similarity
fn distance_to_similarity(distance: f32) -> f32 {
  1.0 - distance
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::lancedb::records::records_to_arrow_batch;
  use crate::server::services::vector_database::IndexRecord;

  #[test]
  fn test_distance_to_similarity() {
    assert_eq!(distance_to_similarity(0.0), 1.0);
    assert_eq!(distance_to_similarity(1.0), 0.0);
    assert!((distance_to_similarity(0.25) - 0.75).abs() < 1e-6);
  }

  #[test]
  fn test_batch_without_distance_scores_zero() {
    let records = vec![IndexRecord {
      id: "잎길이:찰피나무:0".to_string(),
      embedding: vec![0.5, 0.5],
      metadata: RecordMetadata {
        title: "찰피나무".to_string(),
        column: "잎길이".to_string(),
        text: "잎길이".to_string(),
        min: Some(10.0),
        max: Some(15.0),
      },
    }];
    let batch = records_to_arrow_batch(&records, 2).unwrap();

    let matches = process_result_batch(&batch).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].score, 0.0);
    assert_eq!(matches[0].metadata, records[0].metadata);
  }
}
