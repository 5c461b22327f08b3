//! Shared application state handed to every handler

use bentley::daemon_logs::DaemonLogs;
use std::sync::Arc;

use crate::config::HibiscusConfig;
use crate::server::services::classifier::Classifier;
use crate::server::services::embeddings::EmbeddingGateway;
use crate::server::services::ingestion::Ingestion;
use crate::server::services::records::RecordAdmin;
use crate::server::services::vector_database::VectorStore;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn VectorStore>,
  pub classifier: Arc<Classifier>,
  pub ingestion: Arc<Ingestion>,
  pub records: Arc<RecordAdmin>,
  pub logs: Arc<DaemonLogs>,
}

impl AppState {
  /// Wire the services around one store and one embedding gateway
  pub fn new(
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn EmbeddingGateway>,
    config: &HibiscusConfig,
    logs: Arc<DaemonLogs>,
  ) -> Self {
    Self {
      classifier: Arc::new(Classifier::new(
        store.clone(),
        embeddings.clone(),
        config.classifier.clone(),
      )),
      ingestion: Arc::new(Ingestion::new(store.clone(), embeddings, config.ingestion.clone())),
      records: Arc::new(RecordAdmin::new(store.clone(), config.store.admin_limit)),
      store,
      logs,
    }
  }
}
