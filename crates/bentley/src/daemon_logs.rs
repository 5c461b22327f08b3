//! Persistent request logs for long-running services
//!
//! Entries are appended to a JSONL file, one object per line, behind an
//! async mutex so handlers on different tasks can share a single store.
//! Every entry is mirrored to the console unless the store is silent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[cfg(feature = "schemars")]
use schemars::JsonSchema;

use crate::Level;

/// Request context attached to a log entry
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogContext {
  /// Request ID for correlation
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,

  /// HTTP method
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,

  /// Request path
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,

  /// Request duration in milliseconds
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,

  /// HTTP status code
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
}

/// A structured log entry
#[derive(Debug, Serialize, Deserialize, Clone)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: Level,
  pub message: String,
  pub component: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

/// Filter applied when reading entries back
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
  /// Keep only the newest `limit` entries
  pub limit: Option<usize>,
  /// Keep only entries at this level
  pub level: Option<Level>,
  /// Keep only entries from this component
  pub component: Option<String>,
}

impl LogQuery {
  fn matches(&self, entry: &LogEntry) -> bool {
    self.level.is_none_or(|level| entry.level == level)
      && self.component.as_deref().is_none_or(|component| entry.component == component)
  }
}

struct DaemonLogsInner {
  log_file_path: PathBuf,
  silent: bool,
}

/// Thread-safe JSONL log store
#[derive(Clone)]
pub struct DaemonLogs {
  inner: Arc<Mutex<DaemonLogsInner>>,
}

impl DaemonLogsInner {
  fn open(log_file_path: &Path, silent: bool) -> std::io::Result<Self> {
    if let Some(parent) = log_file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    // Create if missing, never truncate
    OpenOptions::new().create(true).append(true).open(log_file_path)?;

    Ok(Self { log_file_path: log_file_path.to_path_buf(), silent })
  }

  fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
    let json_line = serde_json::to_string(entry)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut file = OpenOptions::new().create(true).append(true).open(&self.log_file_path)?;
    writeln!(file, "{json_line}")?;
    file.flush()
  }

  fn read(&self, query: &LogQuery) -> std::io::Result<Vec<LogEntry>> {
    if !self.log_file_path.exists() {
      return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&self.log_file_path)?);
    let mut logs = Vec::new();

    for line in reader.lines() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }

      // Skip malformed lines
      if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
        if query.matches(&entry) {
          logs.push(entry);
        }
      }
    }

    // File order is append order; keep the newest `limit`, oldest first
    if let Some(limit) = query.limit {
      let skip = logs.len().saturating_sub(limit);
      logs.drain(..skip);
    }

    Ok(logs)
  }
}

impl DaemonLogs {
  /// Open (or create) a log store at the given path
  pub fn new<P: AsRef<Path>>(log_file_path: P) -> std::io::Result<Self> {
    Self::new_with_silent(log_file_path, false)
  }

  /// Open a log store, optionally without console mirroring
  pub fn new_with_silent<P: AsRef<Path>>(log_file_path: P, silent: bool) -> std::io::Result<Self> {
    let inner = DaemonLogsInner::open(log_file_path.as_ref(), silent)?;
    Ok(Self { inner: Arc::new(Mutex::new(inner)) })
  }

  /// Append an entry, returning any I/O failure
  pub async fn add_log(
    &self,
    level: Level,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) -> std::io::Result<()> {
    let entry = LogEntry {
      timestamp: Utc::now(),
      level,
      message: message.to_string(),
      component: component.to_string(),
      context,
    };

    let guard = self.inner.lock().await;
    guard.append(&entry)?;
    if !guard.silent {
      crate::log(level, &format!("[{component}] {message}"));
    }
    Ok(())
  }

  /// Append an entry (fire-and-forget, ignores errors)
  pub async fn log(&self, level: Level, message: &str, component: &str) {
    let _ = self.add_log(level, message, component, None).await;
  }

  /// Append an entry with request context (fire-and-forget)
  pub async fn log_with_context(
    &self,
    level: Level,
    message: &str,
    component: &str,
    context: LogContext,
  ) {
    let _ = self.add_log(level, message, component, Some(context)).await;
  }

  /// Read entries back, filtered and limited
  pub async fn get_logs(&self, query: &LogQuery) -> std::io::Result<Vec<LogEntry>> {
    let guard = self.inner.lock().await;
    guard.read(query)
  }

  pub async fn info(&self, message: &str, component: &str) {
    self.log(Level::Info, message, component).await;
  }

  pub async fn success(&self, message: &str, component: &str) {
    self.log(Level::Success, message, component).await;
  }

  pub async fn warn(&self, message: &str, component: &str) {
    self.log(Level::Warn, message, component).await;
  }

  pub async fn error(&self, message: &str, component: &str) {
    self.log(Level::Error, message, component).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  fn temp_log_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("requests.jsonl");
    (temp_dir, log_path)
  }

  #[tokio::test]
  async fn test_new_creates_file_and_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("nested").join("deep").join("requests.jsonl");

    let logs = DaemonLogs::new_with_silent(&nested_path, true).unwrap();
    logs.info("ready", "comp").await;

    assert!(nested_path.exists());
    assert_eq!(fs::read_to_string(&nested_path).unwrap().lines().count(), 1);
  }

  #[tokio::test]
  async fn test_add_log_writes_jsonl_line() {
    let (_temp_dir, log_path) = temp_log_path();
    let logs = DaemonLogs::new_with_silent(&log_path, true).unwrap();

    logs.add_log(Level::Info, "Stored 3 records", "ingestion", None).await.unwrap();

    let content = fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.trim().split('\n').collect();
    assert_eq!(lines.len(), 1);

    let entry: LogEntry = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry.message, "Stored 3 records");
    assert_eq!(entry.level, Level::Info);
    assert_eq!(entry.component, "ingestion");
    assert!(entry.context.is_none());
  }

  #[tokio::test]
  async fn test_context_round_trips_through_file() {
    let (_temp_dir, log_path) = temp_log_path();
    let logs = DaemonLogs::new_with_silent(&log_path, true).unwrap();
    let context = LogContext {
      request_id: Some("abc".to_string()),
      method: Some("GET".to_string()),
      path: Some("/pinecone/queryPinecone".to_string()),
      duration_ms: Some(12.5),
      status_code: Some(200),
    };

    logs
      .log_with_context(Level::Success, "Request completed", "http-request", context.clone())
      .await;

    let entries = logs.get_logs(&LogQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].context.as_ref(), Some(&context));
  }

  #[tokio::test]
  async fn test_get_logs_filters_by_level_and_component() {
    let (_temp_dir, log_path) = temp_log_path();
    let logs = DaemonLogs::new_with_silent(&log_path, true).unwrap();

    logs.info("first", "classifier").await;
    logs.warn("second", "classifier").await;
    logs.info("third", "ingestion").await;

    let query = LogQuery { level: Some(Level::Info), ..Default::default() };
    let infos = logs.get_logs(&query).await.unwrap();
    assert_eq!(infos.len(), 2);

    let classifier = logs
      .get_logs(&LogQuery { component: Some("classifier".to_string()), ..Default::default() })
      .await
      .unwrap();
    let messages: Vec<_> = classifier.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
  }

  #[tokio::test]
  async fn test_get_logs_limit_keeps_newest_entries() {
    let (_temp_dir, log_path) = temp_log_path();
    let logs = DaemonLogs::new_with_silent(&log_path, true).unwrap();

    for i in 1..=5 {
      logs.info(&format!("Message {i}"), "comp").await;
    }

    let limited = logs.get_logs(&LogQuery { limit: Some(2), ..Default::default() }).await.unwrap();
    let messages: Vec<_> = limited.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["Message 4", "Message 5"]);

    let empty = logs.get_logs(&LogQuery { limit: Some(0), ..Default::default() }).await.unwrap();
    assert!(empty.is_empty());
  }

  #[tokio::test]
  async fn test_malformed_lines_are_skipped() {
    let (_temp_dir, log_path) = temp_log_path();
    let logs = DaemonLogs::new_with_silent(&log_path, true).unwrap();

    logs.info("valid", "comp").await;
    {
      let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
      writeln!(file, "{{not json").unwrap();
    }
    logs.info("also valid", "comp").await;

    let entries = logs.get_logs(&LogQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
  }
}
