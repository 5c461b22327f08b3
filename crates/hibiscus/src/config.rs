//! Service configuration
//!
//! Loaded from a YAML file; every field has a default so an empty or
//! partial file is valid. The embedding API key never lives in the file,
//! only the name of the environment variable holding it.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{HibiscusError, Result};
use crate::server::services::classifier::ClassifierConfig;
use crate::server::services::embeddings::EmbeddingConfig;
use crate::server::services::ingestion::{IngestionConfig, DEFAULT_INDEX};
use crate::server::services::records::DEFAULT_ADMIN_LIMIT;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HibiscusConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub embedding: EmbeddingConfig,
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub classifier: ClassifierConfig,
  #[serde(default)]
  pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
  /// JSONL request log location
  #[serde(default = "default_log_file")]
  pub log_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
  /// LanceDB data directory
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  /// Indexes created at startup when missing
  #[serde(default = "default_indexes")]
  pub indexes: Vec<String>,
  /// Cap on records returned by administrative scans
  #[serde(default = "default_admin_limit")]
  pub admin_limit: usize,
}

fn hibiscus_home() -> PathBuf {
  dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join(".hibiscus")
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_log_file() -> PathBuf {
  hibiscus_home().join("server.logs.jsonl")
}

fn default_data_dir() -> PathBuf {
  hibiscus_home().join("lancedb")
}

fn default_indexes() -> Vec<String> {
  vec![DEFAULT_INDEX.to_string()]
}

fn default_admin_limit() -> usize {
  DEFAULT_ADMIN_LIMIT
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { bind: default_bind(), log_file: default_log_file() }
  }
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      indexes: default_indexes(),
      admin_limit: default_admin_limit(),
    }
  }
}

impl HibiscusConfig {
  /// Default location of the configuration file
  pub fn default_path() -> PathBuf {
    hibiscus_home().join("config.yaml")
  }

  /// Load and validate a configuration file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(HibiscusError::ConfigNotFound { path: path.to_path_buf() });
    }

    let content = std::fs::read_to_string(path)
      .map_err(|e| HibiscusError::io(e, format!("reading {}", path.display())))?;
    let config = Self::from_yaml(&content).map_err(|e| match e {
      HibiscusError::Config { message, .. } => {
        HibiscusError::config(path.display().to_string(), message)
      }
      other => other,
    })?;

    Ok(config)
  }

  /// Load the given file, or the default file if it exists, or defaults
  pub fn load(path: Option<&Path>) -> Result<Self> {
    match path {
      Some(path) => Self::load_from_file(path),
      None => {
        let default_path = Self::default_path();
        if default_path.exists() {
          Self::load_from_file(default_path)
        } else {
          Ok(Self::default())
        }
      }
    }
  }

  /// Parse and validate YAML text
  pub fn from_yaml(content: &str) -> Result<Self> {
    let config: Self = if content.trim().is_empty() {
      Self::default()
    } else {
      serde_yaml::from_str(content).map_err(|e| HibiscusError::config("<yaml>", e.to_string()))?
    };
    config.validate()?;
    Ok(config)
  }

  /// Reject settings that would make the service unusable
  pub fn validate(&self) -> Result<()> {
    let checks = [
      ("classifier.top_k", self.classifier.top_k == 0),
      ("embedding.dimensions", self.embedding.dimensions == 0),
      ("ingestion.chunk_size", self.ingestion.chunk_size == 0),
      ("store.admin_limit", self.store.admin_limit == 0),
    ];
    if let Some((field, _)) = checks.iter().find(|(_, invalid)| *invalid) {
      return Err(HibiscusError::config(*field, "must be greater than zero"));
    }

    if self.store.indexes.iter().any(|index| index.trim().is_empty()) {
      return Err(HibiscusError::config("store.indexes", "index names must not be empty"));
    }
    if !self.store.indexes.contains(&self.classifier.index) {
      return Err(HibiscusError::config(
        "classifier.index",
        format!("'{}' is not listed in store.indexes", self.classifier.index),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_empty_yaml_gives_defaults() {
    let config = HibiscusConfig::from_yaml("").unwrap();
    assert_eq!(config, HibiscusConfig::default());
    assert_eq!(config.classifier.top_k, 5);
    assert_eq!(config.store.indexes, vec!["classify".to_string()]);
    assert_eq!(config.ingestion.chunk_size, 1000);
  }

  #[test]
  fn test_partial_yaml_keeps_other_defaults() {
    let config = HibiscusConfig::from_yaml(
      "classifier:\n  top_k: 30\n  lookup_timeout_ms: null\nserver:\n  bind: 0.0.0.0:9000\n",
    )
    .unwrap();

    assert_eq!(config.classifier.top_k, 30);
    assert_eq!(config.classifier.lookup_timeout_ms, None);
    assert_eq!(config.classifier.index, "classify");
    assert_eq!(config.server.bind.port(), 9000);
    assert_eq!(config.embedding.model, "text-embedding-3-small");
  }

  #[test]
  fn test_zero_top_k_is_rejected() {
    let err = HibiscusConfig::from_yaml("classifier:\n  top_k: 0\n").unwrap_err();
    assert!(err.to_string().contains("classifier.top_k"));
  }

  #[test]
  fn test_classifier_index_must_be_configured() {
    let err = HibiscusConfig::from_yaml("classifier:\n  index: other\n").unwrap_err();
    assert!(err.to_string().contains("other"));
  }

  #[test]
  fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "store:\n  indexes: [classify, staging]\n  admin_limit: 50\n").unwrap();

    let config = HibiscusConfig::load_from_file(&path).unwrap();
    assert_eq!(config.store.indexes.len(), 2);
    assert_eq!(config.store.admin_limit, 50);
  }

  #[test]
  fn test_missing_file_is_config_not_found() {
    let err = HibiscusConfig::load(Some(Path::new("/nonexistent/hibiscus.yaml"))).unwrap_err();
    assert!(matches!(err, HibiscusError::ConfigNotFound { .. }));
  }

  #[test]
  fn test_invalid_yaml_names_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.yaml");
    fs::write(&path, "classifier: [not, a, map]\n").unwrap();

    let err = HibiscusConfig::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("config.yaml"));
  }
}
