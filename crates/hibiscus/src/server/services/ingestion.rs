//! Record ingestion: attribute observations into index records
//!
//! Categorical observations are decoded from their numeric codes into
//! canonical labels, joined into one description per title, chunked and
//! embedded. Range observations embed the attribute's name and carry their
//! bounds as metadata only. A batch is validated and embedded completely
//! before anything is written, so a failing row leaves the index untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::attributes::{Attribute, AttributeKind};
use crate::chunking::RecursiveSplitter;
use crate::error::{HibiscusError, Result};
use crate::server::services::embeddings::EmbeddingGateway;
use crate::server::services::records::DEFAULT_ADMIN_LIMIT;
use crate::server::services::vector_database::{
  IndexRecord, MetadataFilter, RecordMetadata, StoreQuery, VectorStore,
};

/// Spreadsheet header holding the species title
pub const TITLE_HEADER: &str = "국명";

/// Index used when a request does not name one
pub const DEFAULT_INDEX: &str = "classify";

fn default_index() -> String {
  DEFAULT_INDEX.to_string()
}

fn default_chunk_size() -> usize {
  1000
}

/// Chunking settings for descriptive records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestionConfig {
  #[serde(default = "default_chunk_size")]
  pub chunk_size: usize,
  #[serde(default)]
  pub chunk_overlap: usize,
}

impl Default for IngestionConfig {
  fn default() -> Self {
    Self { chunk_size: default_chunk_size(), chunk_overlap: 0 }
  }
}

/// A single descriptive record for one title and column
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateRecord {
  #[serde(default = "default_index")]
  pub index: String,
  pub title: String,
  pub column: String,
  pub description: String,
}

/// A single range record for one title and range column
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateRangeRecord {
  #[serde(default = "default_index")]
  pub index: String,
  pub title: String,
  pub column: String,
  pub min: f64,
  pub max: f64,
}

/// Parsed spreadsheet: one map of header to cell per row
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Sheet {
  pub rows: Vec<BTreeMap<String, Value>>,
}

impl Sheet {
  fn headers(&self) -> BTreeSet<&str> {
    self.rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect()
  }
}

/// Outcome of a spreadsheet ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IngestReport {
  /// Rows in the sheet
  pub rows: usize,
  /// Rows skipped for a missing title or cell
  pub skipped: usize,
  /// Records written to the index
  pub records: usize,
}

/// Header holding a range attribute's lower bound
pub fn min_header(attribute: Attribute) -> String {
  format!("{} 최소", attribute.column())
}

/// Header holding a range attribute's upper bound
pub fn max_header(attribute: Attribute) -> String {
  format!("{} 최대", attribute.column())
}

/// Cell contents as trimmed text; `None` when blank
fn cell_text(row: &BTreeMap<String, Value>, header: &str) -> Option<String> {
  let text = match row.get(header)? {
    Value::Null => return None,
    Value::String(s) => s.trim().to_string(),
    Value::Number(number) => number_text(number),
    other => other.to_string(),
  };
  if text.is_empty() {
    None
  } else {
    Some(text)
  }
}

/// Whole floats ("1.0") render as integers so they read as codes
fn number_text(number: &Number) -> String {
  match number.as_f64() {
    Some(value) if number.is_f64() && value.fract() == 0.0 && value.abs() < 1e15 => {
      format!("{value:.0}")
    }
    _ => number.to_string(),
  }
}

/// A title's decoded labels, not yet embedded
struct PendingDescription {
  title: String,
  chunks: Vec<String>,
}

/// A range row parsed but not yet embedded
struct PendingRange {
  title: String,
  min: f64,
  max: f64,
}

pub struct Ingestion {
  store: Arc<dyn VectorStore>,
  embeddings: Arc<dyn EmbeddingGateway>,
  splitter: RecursiveSplitter,
}

impl Ingestion {
  pub fn new(
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn EmbeddingGateway>,
    config: IngestionConfig,
  ) -> Self {
    let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap);
    Self { store, embeddings, splitter }
  }

  /// Store one descriptive record, returning the number of chunks written
  pub async fn create_record(&self, request: CreateRecord) -> Result<usize> {
    let title = require_text("title", &request.title)?;
    let description = require_text("description", &request.description)?;
    let attribute = resolve_column(&request.column)?;
    if attribute.is_range() {
      return Err(HibiscusError::validation(
        "column",
        format!("'{}' is a range attribute; use createRangeRecord", attribute.column()),
      ));
    }

    self.ensure_index(&request.index).await?;
    self.ensure_new_title(&request.index, title, attribute).await?;

    let chunks = self.splitter.split(description);
    let records = self.embed_description(attribute, title, chunks).await?;
    self.store.upsert(&request.index, &records).await?;

    bentley::info!("Stored {} record(s) for '{title}' in {attribute}", records.len());
    Ok(records.len())
  }

  /// Store one range record
  pub async fn create_range_record(&self, request: CreateRangeRecord) -> Result<usize> {
    let title = require_text("title", &request.title)?;
    let attribute = resolve_column(&request.column)?;
    validate_range(attribute, request.min, request.max)?;

    self.ensure_index(&request.index).await?;
    self.ensure_new_title(&request.index, title, attribute).await?;

    let embedding = self.embeddings.embed_query(attribute.column()).await?;
    let record = range_record(attribute, title, request.min, request.max, embedding);
    self.store.upsert(&request.index, &[record]).await?;

    bentley::info!("Stored {attribute} {} ~ {} for '{title}'", request.min, request.max);
    Ok(1)
  }

  /// Ingest a spreadsheet for one attribute as a single batch
  pub async fn ingest_sheet(
    &self,
    attribute: Attribute,
    index: &str,
    sheet: &Sheet,
  ) -> Result<IngestReport> {
    self.ensure_index(index).await?;

    let mut report = IngestReport { rows: sheet.rows.len(), ..Default::default() };
    if sheet.rows.is_empty() {
      return Ok(report);
    }

    let records = match attribute.kind() {
      AttributeKind::Categorical(_) => {
        let (pending, skipped) = self.decode_categorical_rows(attribute, sheet)?;
        report.skipped = skipped;

        let mut records = Vec::new();
        for row in pending {
          records.extend(self.embed_description(attribute, &row.title, row.chunks).await?);
        }
        records
      }
      AttributeKind::Range { .. } => {
        let (pending, skipped) = parse_range_rows(attribute, sheet)?;
        report.skipped = skipped;

        if pending.is_empty() {
          Vec::new()
        } else {
          let embedding = self.embeddings.embed_query(attribute.column()).await?;
          pending
            .into_iter()
            .map(|row| range_record(attribute, &row.title, row.min, row.max, embedding.clone()))
            .collect()
        }
      }
    };

    self.replace_records(index, attribute, &records).await?;
    report.records = records.len();

    bentley::info!(
      "Ingested {attribute} sheet into '{index}': {} rows, {} skipped, {} records",
      report.rows,
      report.skipped,
      report.records
    );
    Ok(report)
  }

  fn decode_categorical_rows(
    &self,
    attribute: Attribute,
    sheet: &Sheet,
  ) -> Result<(Vec<PendingDescription>, usize)> {
    let column = attribute.column();
    require_headers(sheet, &[TITLE_HEADER, column])?;

    // Rows repeating a title add to that title's labels
    let mut grouped: Vec<(String, Vec<&'static str>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0;

    for (row_number, row) in (1..).zip(&sheet.rows) {
      let (Some(title), Some(codes)) = (cell_text(row, TITLE_HEADER), cell_text(row, column)) else {
        skipped += 1;
        continue;
      };

      let labels = codes
        .split_whitespace()
        .map(|code| {
          attribute.label_for_code(code).map_err(|_| {
            HibiscusError::validation(
              format!("{column} (row {row_number})"),
              format!("code '{code}' has no {column} label"),
            )
          })
        })
        .collect::<Result<Vec<_>>>()?;

      let position = *positions.entry(title.clone()).or_insert_with(|| {
        grouped.push((title, Vec::new()));
        grouped.len() - 1
      });
      let title_labels = &mut grouped[position].1;
      for label in labels {
        if !title_labels.contains(&label) {
          title_labels.push(label);
        }
      }
    }

    let mut pending = Vec::new();
    for (title, labels) in grouped {
      let chunks = self.splitter.split(&labels.join(" "));
      if chunks.is_empty() {
        skipped += 1;
        continue;
      }
      pending.push(PendingDescription { title, chunks });
    }

    Ok((pending, skipped))
  }

  async fn embed_description(
    &self,
    attribute: Attribute,
    title: &str,
    chunks: Vec<String>,
  ) -> Result<Vec<IndexRecord>> {
    if chunks.is_empty() {
      return Err(HibiscusError::validation("description", "no text left after chunking"));
    }

    let embeddings = self.embeddings.embed_documents(&chunks).await?;
    if embeddings.len() != chunks.len() {
      return Err(HibiscusError::embedding_unavailable(format!(
        "received {} embeddings for {} chunks",
        embeddings.len(),
        chunks.len()
      )));
    }

    Ok(
      chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(chunk_index, (text, embedding))| IndexRecord {
          id: IndexRecord::record_id(attribute.column(), title, chunk_index),
          embedding,
          metadata: RecordMetadata {
            title: title.to_string(),
            column: attribute.column().to_string(),
            text,
            min: None,
            max: None,
          },
        })
        .collect(),
    )
  }

  /// Upsert a batch, then drop chunks left over from a title's longer
  /// previous description
  async fn replace_records(
    &self,
    index: &str,
    attribute: Attribute,
    records: &[IndexRecord],
  ) -> Result<()> {
    if records.is_empty() {
      return Ok(());
    }
    self.store.upsert(index, records).await?;

    let fresh: HashSet<&str> = records.iter().map(|record| record.id.as_str()).collect();
    let titles: BTreeSet<&str> =
      records.iter().map(|record| record.metadata.title.as_str()).collect();

    let mut stale = Vec::new();
    for title in titles {
      let filter = MetadataFilter::by_column(attribute.column()).and_title(title);
      let query = StoreQuery { vector: None, filter, top_k: DEFAULT_ADMIN_LIMIT };
      let existing = self.store.query(index, query).await?;
      stale.extend(existing.into_iter().map(|m| m.id).filter(|id| !fresh.contains(id.as_str())));
    }

    if !stale.is_empty() {
      let removed = self.store.delete(index, &stale).await?;
      bentley::verbose!("Removed {removed} stale {attribute} record(s) from '{index}'");
    }
    Ok(())
  }

  async fn ensure_index(&self, index: &str) -> Result<()> {
    let indexes = self.store.list_indexes().await?;
    if indexes.iter().any(|name| name == index) {
      Ok(())
    } else {
      Err(HibiscusError::not_found(format!("index '{index}'")))
    }
  }

  async fn ensure_new_title(&self, index: &str, title: &str, attribute: Attribute) -> Result<()> {
    let filter = MetadataFilter::by_column(attribute.column()).and_title(title);
    let existing = self.store.query(index, StoreQuery { vector: None, filter, top_k: 1 }).await?;

    if existing.is_empty() {
      Ok(())
    } else {
      Err(HibiscusError::conflict(format!(
        "'{title}' already has {attribute} records in '{index}'"
      )))
    }
  }
}

fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
  let value = value.trim();
  if value.is_empty() {
    Err(HibiscusError::validation(field, "must not be empty"))
  } else {
    Ok(value)
  }
}

fn resolve_column(column: &str) -> Result<Attribute> {
  Attribute::from_column(column).ok_or_else(|| {
    let message = format!("'{}' is not a known attribute column", column.trim());
    HibiscusError::validation("column", message)
  })
}

fn require_headers(sheet: &Sheet, required: &[&str]) -> Result<()> {
  let headers = sheet.headers();
  match required.iter().find(|header| !headers.contains(*header)) {
    Some(missing) => {
      Err(HibiscusError::validation(*missing, "required column is missing from the sheet"))
    }
    None => Ok(()),
  }
}

fn validate_range(attribute: Attribute, min: f64, max: f64) -> Result<()> {
  let AttributeKind::Range { min: lower, max: upper } = attribute.kind() else {
    return Err(HibiscusError::validation(
      "column",
      format!("'{}' is not a range attribute", attribute.column()),
    ));
  };

  if !min.is_finite() || !max.is_finite() || min < lower || max > upper {
    return Err(HibiscusError::validation(
      attribute.column(),
      format!("{min} ~ {max} is outside {lower} ~ {upper}"),
    ));
  }
  if min > max {
    return Err(HibiscusError::validation(
      attribute.column(),
      format!("minimum {min} exceeds maximum {max}"),
    ));
  }
  Ok(())
}

fn parse_range_rows(attribute: Attribute, sheet: &Sheet) -> Result<(Vec<PendingRange>, usize)> {
  let min_header = min_header(attribute);
  let max_header = max_header(attribute);
  require_headers(sheet, &[TITLE_HEADER, min_header.as_str(), max_header.as_str()])?;

  let mut pending = Vec::new();
  let mut seen: HashMap<String, usize> = HashMap::new();
  let mut skipped = 0;

  for (row_number, row) in (1..).zip(&sheet.rows) {
    let (Some(title), Some(min), Some(max)) =
      (cell_text(row, TITLE_HEADER), cell_text(row, &min_header), cell_text(row, &max_header))
    else {
      skipped += 1;
      continue;
    };

    let min = parse_bound(&min_header, row_number, &min)?;
    let max = parse_bound(&max_header, row_number, &max)?;
    validate_range(attribute, min, max).map_err(|e| match e {
      HibiscusError::Validation { field, message } => {
        HibiscusError::validation(format!("{field} (row {row_number})"), message)
      }
      other => other,
    })?;

    if let Some(first_row) = seen.insert(title.clone(), row_number) {
      return Err(HibiscusError::validation(
        format!("{TITLE_HEADER} (row {row_number})"),
        format!("'{title}' already has a {} range in row {first_row}", attribute.column()),
      ));
    }
    pending.push(PendingRange { title, min, max });
  }

  Ok((pending, skipped))
}

fn parse_bound(header: &str, row_number: usize, raw: &str) -> Result<f64> {
  raw.parse::<f64>().map_err(|_| {
    let field = format!("{header} (row {row_number})");
    HibiscusError::validation(field, format!("'{raw}' is not a number"))
  })
}

fn range_record(
  attribute: Attribute,
  title: &str,
  min: f64,
  max: f64,
  embedding: Vec<f32>,
) -> IndexRecord {
  IndexRecord {
    id: IndexRecord::record_id(attribute.column(), title, 0),
    embedding,
    metadata: RecordMetadata {
      title: title.to_string(),
      column: attribute.column().to_string(),
      text: attribute.column().to_string(),
      min: Some(min),
      max: Some(max),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::services::embeddings::MockEmbeddingGateway;
  use crate::server::services::memory::InMemoryStore;
  use crate::server::services::vector_database::MockVectorStore;
  use serde_json::json;

  fn embedder() -> MockEmbeddingGateway {
    let mut mock = MockEmbeddingGateway::new();
    mock.expect_embed_query().returning(|_| Ok(vec![1.0, 0.0]));
    mock
      .expect_embed_documents()
      .returning(|texts| Ok(texts.iter().map(|_| vec![0.0, 1.0]).collect()));
    mock
  }

  fn ingestion(store: Arc<InMemoryStore>) -> Ingestion {
    Ingestion::new(store, Arc::new(embedder()), IngestionConfig::default())
  }

  fn sheet(rows: Vec<Value>) -> Sheet {
    Sheet {
      rows: rows
        .into_iter()
        .map(|row| serde_json::from_value(row).unwrap())
        .collect(),
    }
  }

  #[tokio::test]
  async fn test_categorical_sheet_decodes_codes_into_labels() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let report = ingestion
      .ingest_sheet(
        Attribute::LeafTip,
        "classify",
        &sheet(vec![json!({"국명": "찰피나무", "잎끝": "1 3"}), json!({"국명": "잣나무", "잎끝": 2})]),
      )
      .await
      .unwrap();

    assert_eq!(report, IngestReport { rows: 2, skipped: 0, records: 2 });

    let stored = store
      .query(
        "classify",
        StoreQuery { vector: None, filter: MetadataFilter::by_title("찰피나무"), top_k: 10 },
      )
      .await
      .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "잎끝:찰피나무:0");
    assert_eq!(stored[0].metadata.text, "점첨두 급첨두");
  }

  #[tokio::test]
  async fn test_undefined_code_fails_whole_sheet() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let err = ingestion
      .ingest_sheet(
        Attribute::LeafTip,
        "classify",
        &sheet(vec![json!({"국명": "찰피나무", "잎끝": "1"}), json!({"국명": "잣나무", "잎끝": "99"})]),
      )
      .await
      .unwrap_err();

    assert!(matches!(err, HibiscusError::Validation { .. }));
    let message = err.to_string();
    assert!(message.contains("row 2"), "{message}");
    assert!(message.contains("99"), "{message}");
    assert_eq!(store.len("classify").await, 0);
  }

  #[tokio::test]
  async fn test_rows_without_title_are_skipped() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let report = ingestion
      .ingest_sheet(
        Attribute::Tooth,
        "classify",
        &sheet(vec![json!({"국명": "", "톱니": "1"}), json!({"국명": "찰피나무", "톱니": null})]),
      )
      .await
      .unwrap();

    assert_eq!(report, IngestReport { rows: 2, skipped: 2, records: 0 });
    assert_eq!(store.len("classify").await, 0);
  }

  #[tokio::test]
  async fn test_missing_header_names_it() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let err = ingestion(store)
      .ingest_sheet(Attribute::LeafBase, "classify", &sheet(vec![json!({"국명": "찰피나무", "잎끝": "1"})]))
      .await
      .unwrap_err();

    assert!(err.to_string().contains("잎밑부분"));
  }

  #[tokio::test]
  async fn test_range_sheet_carries_bounds_as_metadata() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let report = ingestion
      .ingest_sheet(
        Attribute::LeafLength,
        "classify",
        &sheet(vec![
          json!({"국명": "찰피나무", "잎길이 최소": 10, "잎길이 최대": "15"}),
          json!({"국명": "잣나무", "잎길이 최소": 3}),
        ]),
      )
      .await
      .unwrap();
    assert_eq!(report, IngestReport { rows: 2, skipped: 1, records: 1 });

    let stored = store
      .query(
        "classify",
        StoreQuery { vector: None, filter: MetadataFilter::by_column("잎길이"), top_k: 10 },
      )
      .await
      .unwrap();
    assert_eq!(stored[0].metadata.min, Some(10.0));
    assert_eq!(stored[0].metadata.max, Some(15.0));
    assert_eq!(stored[0].metadata.text, "잎길이");
  }

  #[tokio::test]
  async fn test_range_sheet_rejects_unparsable_bound() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let err = ingestion(store)
      .ingest_sheet(
        Attribute::LeafWidth,
        "classify",
        &sheet(vec![json!({"국명": "찰피나무", "잎너비 최소": "넓음", "잎너비 최대": 5})]),
      )
      .await
      .unwrap_err();

    assert!(err.to_string().contains("넓음"));
  }

  #[tokio::test]
  async fn test_create_record_conflicts_on_existing_title() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());
    let request = CreateRecord {
      index: "classify".to_string(),
      title: "찰피나무".to_string(),
      column: "잎차례".to_string(),
      description: "어긋나기".to_string(),
    };

    assert_eq!(ingestion.create_record(request.clone()).await.unwrap(), 1);
    let err = ingestion.create_record(request).await.unwrap_err();
    assert!(matches!(err, HibiscusError::Conflict { .. }));
  }

  #[tokio::test]
  async fn test_create_record_requires_existing_index() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let err = ingestion(store)
      .create_record(CreateRecord {
        index: "missing".to_string(),
        title: "찰피나무".to_string(),
        column: "잎차례".to_string(),
        description: "어긋나기".to_string(),
      })
      .await
      .unwrap_err();
    assert!(matches!(err, HibiscusError::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_create_range_record_validates_bounds() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store);
    let request = |column: &str, min: f64, max: f64| CreateRangeRecord {
      index: "classify".to_string(),
      title: "찰피나무".to_string(),
      column: column.to_string(),
      min,
      max,
    };

    assert!(ingestion.create_range_record(request("잎길이", 15.0, 10.0)).await.is_err());
    assert!(ingestion.create_range_record(request("잎길이", 10.0, 80.0)).await.is_err());
    assert!(ingestion.create_range_record(request("잎끝", 1.0, 2.0)).await.is_err());
    assert_eq!(ingestion.create_range_record(request("잎길이", 10.0, 15.0)).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_embedding_failure_aborts_batch() {
    let mut embeddings = MockEmbeddingGateway::new();
    embeddings.expect_embed_documents().returning(|texts| {
      if texts.iter().any(|t| t.contains("복엽")) {
        Err(HibiscusError::embedding_unavailable("timeout"))
      } else {
        Ok(texts.iter().map(|_| vec![1.0]).collect())
      }
    });

    let mut store = MockVectorStore::new();
    store.expect_list_indexes().returning(|| Ok(vec!["classify".to_string()]));
    store.expect_upsert().never();

    let ingestion =
      Ingestion::new(Arc::new(store), Arc::new(embeddings), IngestionConfig::default());
    let err = ingestion
      .ingest_sheet(
        Attribute::Shape,
        "classify",
        &sheet(vec![json!({"국명": "찰피나무", "생김새": "1"}), json!({"국명": "잣나무", "생김새": "2"})]),
      )
      .await
      .unwrap_err();

    assert!(matches!(err, HibiscusError::UpstreamUnavailable { .. }));
  }

  #[tokio::test]
  async fn test_rows_repeating_a_title_are_merged() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let report = ingestion
      .ingest_sheet(
        Attribute::LeafTip,
        "classify",
        &sheet(vec![
          json!({"국명": "찰피나무", "잎끝": "1"}),
          json!({"국명": "찰피나무", "잎끝": "2 1"}),
        ]),
      )
      .await
      .unwrap();

    assert_eq!(report, IngestReport { rows: 2, skipped: 0, records: 1 });
    assert_eq!(store.len("classify").await, 1);

    let stored = store
      .query(
        "classify",
        StoreQuery { vector: None, filter: MetadataFilter::by_title("찰피나무"), top_k: 10 },
      )
      .await
      .unwrap();
    assert_eq!(stored[0].metadata.text, "점첨두 예두");
  }

  #[tokio::test]
  async fn test_whole_float_cells_read_as_codes() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let report = ingestion
      .ingest_sheet(Attribute::Tooth, "classify", &sheet(vec![json!({"국명": "찰피나무", "톱니": 1.0})]))
      .await
      .unwrap();
    assert_eq!(report.records, 1);

    let err = ingestion
      .ingest_sheet(Attribute::Tooth, "classify", &sheet(vec![json!({"국명": "잣나무", "톱니": 1.5})]))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("'1.5'"), "{err}");
  }

  #[tokio::test]
  async fn test_reingesting_shorter_description_drops_old_chunks() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let config = IngestionConfig { chunk_size: 5, chunk_overlap: 0 };
    let ingestion = Ingestion::new(store.clone(), Arc::new(embedder()), config);

    let long = sheet(vec![json!({"국명": "찰피나무", "잎날": "1 2 3 4"})]);
    let report = ingestion.ingest_sheet(Attribute::LeafBlade, "classify", &long).await.unwrap();
    assert!(report.records > 1);
    assert_eq!(store.len("classify").await, report.records);

    let short = sheet(vec![json!({"국명": "찰피나무", "잎날": "1"})]);
    let report = ingestion.ingest_sheet(Attribute::LeafBlade, "classify", &short).await.unwrap();
    assert_eq!(report.records, 1);

    let stored = store
      .query(
        "classify",
        StoreQuery { vector: None, filter: MetadataFilter::by_title("찰피나무"), top_k: 10 },
      )
      .await
      .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, "잎날:찰피나무:0");
    assert_eq!(stored[0].metadata.text, "침형");
  }

  #[tokio::test]
  async fn test_range_sheet_rejects_repeated_title() {
    let store = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let ingestion = ingestion(store.clone());

    let err = ingestion
      .ingest_sheet(
        Attribute::LeafLength,
        "classify",
        &sheet(vec![
          json!({"국명": "찰피나무", "잎길이 최소": 5, "잎길이 최대": 10}),
          json!({"국명": "찰피나무", "잎길이 최소": 8, "잎길이 최대": 15}),
        ]),
      )
      .await
      .unwrap_err();

    assert!(matches!(err, HibiscusError::Validation { .. }));
    assert!(err.to_string().contains("row 2"), "{err}");
    assert_eq!(store.len("classify").await, 0);
  }
}
