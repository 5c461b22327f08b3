//! Arrow RecordBatch conversion for index records

use anyhow::{anyhow, Result};
use arrow::array::{Array, ArrayRef, FixedSizeListBuilder, Float32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::server::services::vector_database::IndexRecord;

/// Arrow schema for one index table with `dimension`-wide embeddings
pub fn index_schema(dimension: usize) -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("id", DataType::Utf8, false),
    Field::new("title", DataType::Utf8, false),
    Field::new("attribute", DataType::Utf8, false),
    Field::new("text", DataType::Utf8, false),
    Field::new("min_value", DataType::Float64, true),
    Field::new("max_value", DataType::Float64, true),
    Field::new(
      "embedding",
      DataType::FixedSizeList(
        Arc::new(Field::new("item", DataType::Float32, true)),
        dimension as i32,
      ),
      false,
    ),
  ]))
}

/// Convert index records to a single Arrow RecordBatch
pub fn records_to_arrow_batch(records: &[IndexRecord], dimension: usize) -> Result<RecordBatch> {
  if records.is_empty() {
    return Err(anyhow!("Cannot create RecordBatch from empty records"));
  }
  validate_dimensions(records, dimension)?;

  let columns: Vec<ArrayRef> = vec![
    Arc::new(string_column(records, |r| &r.id)),
    Arc::new(string_column(records, |r| &r.metadata.title)),
    Arc::new(string_column(records, |r| &r.metadata.column)),
    Arc::new(string_column(records, |r| &r.metadata.text)),
    Arc::new(Float64Array::from(records.iter().map(|r| r.metadata.min).collect::<Vec<_>>())),
    Arc::new(Float64Array::from(records.iter().map(|r| r.metadata.max).collect::<Vec<_>>())),
    Arc::new(embedding_column(records, dimension)),
  ];

  RecordBatch::try_new(index_schema(dimension), columns)
    .map_err(|e| anyhow!("Failed to create RecordBatch: {}", e))
}

fn validate_dimensions(records: &[IndexRecord], dimension: usize) -> Result<()> {
  match records.iter().find(|r| r.embedding.len() != dimension) {
    Some(record) => Err(anyhow!(
      "Record '{}' has a {}-dimensional embedding, index expects {}",
      record.id,
      record.embedding.len(),
      dimension
    )),
    None => Ok(()),
  }
}

fn string_column<F>(records: &[IndexRecord], field_fn: F) -> StringArray
where
  F: Fn(&IndexRecord) -> &str,
{
  StringArray::from(records.iter().map(|r| Some(field_fn(r))).collect::<Vec<Option<&str>>>())
}

fn embedding_column(records: &[IndexRecord], dimension: usize) -> arrow::array::FixedSizeListArray {
  let values = Float32Array::builder(dimension * records.len());
  let mut builder = FixedSizeListBuilder::new(values, dimension as i32);

  for record in records {
    builder.values().append_slice(&record.embedding);
    builder.append(true);
  }

  builder.finish()
}
