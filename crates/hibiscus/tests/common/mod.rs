//! Shared fixtures for the HTTP-level tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
  body::{to_bytes, Body},
  http::{Method, Request, StatusCode},
  Router,
};
use bentley::daemon_logs::DaemonLogs;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use hibiscus::server::routing::create_router;
use hibiscus::server::services::embeddings::EmbeddingGateway;
use hibiscus::server::services::memory::InMemoryStore;
use hibiscus::server::services::vector_database::{IndexRecord, StoreMatch, StoreQuery, VectorStore};
use hibiscus::server::state::AppState;
use hibiscus::{HibiscusConfig, HibiscusError, Result};

const DIMENSION: usize = 16;

/// Bag-of-characters embedding: identical text always gets identical vectors
pub struct CharEmbeddings;

impl CharEmbeddings {
  pub fn vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for c in text.chars().filter(|c| !c.is_whitespace()) {
      vector[c as usize % DIMENSION] += 1.0;
    }
    vector
  }
}

#[async_trait]
impl EmbeddingGateway for CharEmbeddings {
  async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
    Ok(Self::vector(text))
  }

  async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    Ok(texts.iter().map(|text| Self::vector(text)).collect())
  }
}

/// Delegates to an in-memory store but fails similarity queries on one column
pub struct FailingColumnStore {
  pub inner: Arc<InMemoryStore>,
  pub column: String,
}

#[async_trait]
impl VectorStore for FailingColumnStore {
  async fn list_indexes(&self) -> Result<Vec<String>> {
    self.inner.list_indexes().await
  }

  async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<()> {
    self.inner.upsert(index, records).await
  }

  async fn query(&self, index: &str, query: StoreQuery) -> Result<Vec<StoreMatch>> {
    if query.vector.is_some() && query.filter.column.as_deref() == Some(self.column.as_str()) {
      return Err(HibiscusError::store_unavailable(format!("{} partition is offline", self.column)));
    }
    self.inner.query(index, query).await
  }

  async fn delete(&self, index: &str, ids: &[String]) -> Result<usize> {
    self.inner.delete(index, ids).await
  }
}

/// A router wired to an in-memory store, plus handles for inspecting it
pub struct TestApp {
  pub router: Router,
  pub records: Arc<InMemoryStore>,
  _log_dir: TempDir,
}

impl TestApp {
  pub fn new() -> Self {
    let records = Arc::new(InMemoryStore::with_indexes(["classify"]));
    Self::build(records.clone(), records)
  }

  /// Same records, but lookups against `column` fail
  pub fn with_failing_column(column: &str) -> Self {
    let records = Arc::new(InMemoryStore::with_indexes(["classify"]));
    let store = Arc::new(FailingColumnStore { inner: records.clone(), column: column.to_string() });
    Self::build(store, records)
  }

  fn build(store: Arc<dyn VectorStore>, records: Arc<InMemoryStore>) -> Self {
    bentley::set_quiet(true);

    let log_dir = TempDir::new().unwrap();
    let log_path = log_dir.path().join("server.logs.jsonl");
    let logs = Arc::new(DaemonLogs::new_with_silent(log_path, true).unwrap());
    let state = AppState::new(store, Arc::new(CharEmbeddings), &HibiscusConfig::default(), logs);

    Self { router: create_router(state), records, _log_dir: log_dir }
  }

  pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> (StatusCode, String) {
    self.send(Method::GET, &uri(path, params), Body::empty()).await
  }

  pub async fn delete(&self, path: &str, params: &[(&str, &str)]) -> (StatusCode, String) {
    self.send(Method::DELETE, &uri(path, params), Body::empty()).await
  }

  pub async fn post(&self, path: &str, body: Value) -> (StatusCode, String) {
    self.send(Method::POST, path, Body::from(body.to_string())).await
  }

  pub async fn post_raw(&self, path: &str, body: &str) -> (StatusCode, String) {
    self.send(Method::POST, path, Body::from(body.to_string())).await
  }

  async fn send(&self, method: Method, uri: &str, body: Body) -> (StatusCode, String) {
    let request = Request::builder()
      .method(method)
      .uri(uri)
      .header("content-type", "application/json")
      .body(body)
      .unwrap();

    let response = self.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }
}

/// Percent-encode query parameters onto a path
fn uri(path: &str, params: &[(&str, &str)]) -> String {
  if params.is_empty() {
    return path.to_string();
  }
  let url = Url::parse_with_params(&format!("http://localhost{path}"), params).unwrap();
  format!("{}?{}", url.path(), url.query().unwrap_or_default())
}

pub fn json(body: &str) -> Value {
  serde_json::from_str(body).unwrap()
}
