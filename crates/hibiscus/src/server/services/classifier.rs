//! Parallel attribute query engine
//!
//! One lookup is dispatched per known attribute and all of them are awaited
//! together. Results are keyed by [`Attribute`] before dispatch, so the
//! assembled map never depends on completion order. A failed or timed out
//! lookup is logged and contributes nothing; it never fails the request.

use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::attributes::{Attribute, AttributeQuery, AttributeValue};
use crate::error::{HibiscusError, Result};
use crate::server::services::aggregator::{aggregate, RankedSpeciesResult};
use crate::server::services::embeddings::EmbeddingGateway;
use crate::server::services::ingestion::DEFAULT_INDEX;
use crate::server::services::vector_database::{MetadataFilter, StoreQuery, VectorStore};

fn default_index() -> String {
  DEFAULT_INDEX.to_string()
}

fn default_top_k() -> usize {
  5
}

fn default_lookup_timeout_ms() -> Option<u64> {
  Some(10_000)
}

/// Classification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifierConfig {
  /// Index searched by every lookup
  #[serde(default = "default_index")]
  pub index: String,
  /// Matches kept per attribute
  #[serde(default = "default_top_k")]
  pub top_k: usize,
  /// Per-lookup deadline; `None` waits indefinitely
  #[serde(default = "default_lookup_timeout_ms")]
  pub lookup_timeout_ms: Option<u64>,
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    Self {
      index: default_index(),
      top_k: default_top_k(),
      lookup_timeout_ms: default_lookup_timeout_ms(),
    }
  }
}

/// One candidate title and its similarity for a single attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleMatch {
  pub title: String,
  pub score: f32,
}

/// Matches for one attribute, by descending score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PartialMatchResult {
  pub attribute: Attribute,
  pub matches: Vec<TitleMatch>,
}

pub struct Classifier {
  store: Arc<dyn VectorStore>,
  embeddings: Arc<dyn EmbeddingGateway>,
  config: ClassifierConfig,
}

impl Classifier {
  pub fn new(
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn EmbeddingGateway>,
    config: ClassifierConfig,
  ) -> Self {
    Self { store, embeddings, config }
  }

  /// Run every known attribute's lookup concurrently
  ///
  /// Attributes with no matches, a failed lookup or an elapsed deadline
  /// have no entry in the returned map.
  pub async fn query(&self, query: &AttributeQuery) -> BTreeMap<Attribute, PartialMatchResult> {
    let lookups = query.known().map(|(attribute, value)| async move {
      let outcome = self.bounded_lookup(attribute, value).await;
      (attribute, outcome)
    });

    let mut partials = BTreeMap::new();
    for (attribute, outcome) in join_all(lookups).await {
      match outcome {
        Ok(matches) if matches.is_empty() => {
          bentley::verbose!("No {attribute} matches");
        }
        Ok(matches) => {
          partials.insert(attribute, PartialMatchResult { attribute, matches });
        }
        Err(e) => {
          bentley::warn!("{attribute} lookup failed, continuing without it: {e}");
        }
      }
    }
    partials
  }

  /// Classify a query into a ranked species list
  pub async fn classify(&self, query: &AttributeQuery) -> RankedSpeciesResult {
    aggregate(&self.query(query).await)
  }

  async fn bounded_lookup(
    &self,
    attribute: Attribute,
    value: &AttributeValue,
  ) -> Result<Vec<TitleMatch>> {
    match self.config.lookup_timeout_ms {
      Some(ms) => tokio::time::timeout(Duration::from_millis(ms), self.lookup(attribute, value))
        .await
        .unwrap_or_else(|_| {
          let message = format!("{attribute} lookup timed out after {ms}ms");
          Err(HibiscusError::store_unavailable(message))
        }),
      None => self.lookup(attribute, value).await,
    }
  }

  async fn lookup(&self, attribute: Attribute, value: &AttributeValue) -> Result<Vec<TitleMatch>> {
    let (text, filter) = match value {
      AttributeValue::Categorical(label) => {
        (label.as_str(), MetadataFilter::by_column(attribute.column()))
      }
      AttributeValue::Numeric(number) => {
        (attribute.column(), MetadataFilter::by_column(attribute.column()).containing(*number))
      }
      AttributeValue::Unknown => return Ok(Vec::new()),
    };

    let vector = self.embeddings.embed_query(text).await?;
    let query = StoreQuery { vector: Some(vector), filter, top_k: self.config.top_k };
    let store_matches = self.store.query(&self.config.index, query).await?;

    // A title can own several chunks in one column; keep its best
    let mut seen = HashSet::new();
    Ok(
      store_matches
        .into_iter()
        .filter(|m| seen.insert(m.metadata.title.clone()))
        .map(|m| TitleMatch { title: m.metadata.title, score: m.score })
        .collect(),
    )
  }
}
