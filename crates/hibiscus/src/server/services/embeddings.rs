//! Embedding gateway: text to fixed-dimension vectors
//!
//! The production client speaks the OpenAI `/embeddings` protocol, which
//! most hosted and local embedding servers also implement. Calls are made
//! once; a failed request is reported as an upstream outage and retrying is
//! left to the caller.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{HibiscusError, Result};

/// Text embedding capability shared by ingestion and classification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
  /// Embed a single query string
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

  /// Embed several documents, one vector per input in input order
  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Connection settings for an OpenAI-compatible embedding endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmbeddingConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_model")]
  pub model: String,
  #[serde(default = "default_dimensions")]
  pub dimensions: usize,
  /// Send `dimensions` with each request; off for models that reject it
  #[serde(default = "default_send_dimensions")]
  pub send_dimensions: bool,
  /// Name of the environment variable holding the bearer key
  #[serde(default = "default_api_key_env")]
  pub api_key_env: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String {
  "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
  "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
  1536
}

fn default_send_dimensions() -> bool {
  true
}

fn default_api_key_env() -> String {
  "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

impl Default for EmbeddingConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      model: default_model(),
      dimensions: default_dimensions(),
      send_dimensions: default_send_dimensions(),
      api_key_env: default_api_key_env(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl EmbeddingConfig {
  /// Read the bearer key from the configured environment variable
  pub fn api_key_from_env(&self) -> Option<String> {
    std::env::var(&self.api_key_env).ok().filter(|key| !key.trim().is_empty())
  }
}

/// Async client for OpenAI-compatible embedding endpoints
#[derive(Clone)]
pub struct OpenAiEmbeddings {
  client: Client,
  endpoint: String,
  model: String,
  dimensions: usize,
  send_dimensions: bool,
}

impl OpenAiEmbeddings {
  /// Build a client; requests carry no auth header when `api_key` is `None`
  pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self> {
    if config.model.trim().is_empty() {
      return Err(HibiscusError::config("embedding.model", "model name is empty"));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
      let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
        .map_err(|_| {
          HibiscusError::config(config.api_key_env.clone(), "API key is not a valid header value")
        })?;
      headers.insert(AUTHORIZATION, auth);
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .default_headers(headers)
      .build()
      .map_err(|e| {
        HibiscusError::embedding_unavailable(format!("failed to build HTTP client: {e}"))
      })?;

    Ok(Self {
      client,
      endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
      model: config.model.clone(),
      dimensions: config.dimensions,
      send_dimensions: config.send_dimensions,
    })
  }

  async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
    if inputs.is_empty() {
      return Ok(Vec::new());
    }

    let request = EmbeddingRequest {
      model: &self.model,
      input: inputs,
      dimensions: self.send_dimensions.then_some(self.dimensions),
    };
    let response = self
      .client
      .post(&self.endpoint)
      .json(&request)
      .send()
      .await
      .map_err(|e| HibiscusError::embedding_unavailable(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
      return Err(HibiscusError::embedding_unavailable(format!(
        "embeddings request failed ({status}): {body}"
      )));
    }

    let parsed: EmbeddingResponse = response
      .json()
      .await
      .map_err(|e| {
        HibiscusError::embedding_unavailable(format!("invalid embeddings response: {e}"))
      })?;

    vectors_from_response(parsed, inputs.len(), self.dimensions)
  }
}

#[async_trait]
impl EmbeddingGateway for OpenAiEmbeddings {
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    let mut vectors = self.request(&[text]).await?;
    vectors.pop().ok_or_else(|| HibiscusError::embedding_unavailable("no embedding returned"))
  }

  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    self.request(&inputs).await
  }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [&'a str],
  #[serde(skip_serializing_if = "Option::is_none")]
  dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
  index: usize,
}

/// Order vectors by input index and check count and width
fn vectors_from_response(
  mut response: EmbeddingResponse,
  expected: usize,
  dimension: usize,
) -> Result<Vec<Vec<f32>>> {
  response.data.sort_by_key(|entry| entry.index);

  if response.data.len() != expected {
    return Err(HibiscusError::embedding_unavailable(format!(
      "received {} embeddings for {} inputs",
      response.data.len(),
      expected
    )));
  }

  if let Some(bad) = response.data.iter().find(|entry| entry.embedding.len() != dimension) {
    return Err(HibiscusError::embedding_unavailable(format!(
      "embedding {} has {} dimensions, expected {}",
      bad.index,
      bad.embedding.len(),
      dimension
    )));
  }

  Ok(response.data.into_iter().map(|entry| entry.embedding).collect())
}
