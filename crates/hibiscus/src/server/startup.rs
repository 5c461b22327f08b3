//! REST server startup and configuration

use anyhow::{anyhow, Result};
use axum::serve;
use bentley::daemon_logs::DaemonLogs;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::HibiscusConfig;
use crate::server::routing::create_router;
use crate::server::services::embeddings::{EmbeddingGateway, OpenAiEmbeddings};
use crate::server::services::memory::InMemoryStore;
use crate::server::services::vector_database::VectorStore;
use crate::server::state::AppState;

const COMPONENT: &str = "hibiscus-server";

/// Which vector store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  /// LanceDB under `store.data_dir`
  LanceDb,
  /// Process-local store, lost on exit
  Memory,
}

/// Open the configured store and make sure every configured index exists
pub async fn open_store(
  config: &HibiscusConfig,
  backend: StoreBackend,
) -> Result<Arc<dyn VectorStore>> {
  match backend {
    StoreBackend::Memory => {
      let store = InMemoryStore::with_indexes(config.store.indexes.iter().cloned());
      Ok(Arc::new(store))
    }
    #[cfg(feature = "lancedb")]
    StoreBackend::LanceDb => {
      use crate::server::services::lancedb::LanceDbStore;

      let store = LanceDbStore::open(&config.store.data_dir, config.embedding.dimensions).await?;
      store.ensure_indexes(&config.store.indexes).await?;
      Ok(Arc::new(store))
    }
    #[cfg(not(feature = "lancedb"))]
    StoreBackend::LanceDb => Err(anyhow!("built without the `lancedb` feature; run with --memory")),
  }
}

/// Build the production embedding client from config and environment
pub fn open_embeddings(config: &HibiscusConfig) -> Result<Arc<dyn EmbeddingGateway>> {
  let api_key = config.embedding.api_key_from_env();
  if api_key.is_none() {
    bentley::warn!(
      "{} is not set; embedding requests will be unauthenticated",
      config.embedding.api_key_env
    );
  }
  Ok(Arc::new(OpenAiEmbeddings::new(&config.embedding, api_key)?))
}

/// Start the REST server
pub async fn start_server(
  config: HibiscusConfig,
  addr: SocketAddr,
  backend: StoreBackend,
) -> Result<()> {
  let daemon_logs = Arc::new(DaemonLogs::new(&config.server.log_file)?);
  daemon_logs.info(&format!("Starting hibiscus REST server on {addr}"), COMPONENT).await;

  let store = open_store(&config, backend).await?;
  let embeddings = open_embeddings(&config)?;
  let state = AppState::new(store, embeddings, &config, daemon_logs.clone());

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await?;
  daemon_logs.info(&format!("Server listening on {addr} ({backend:?} store)"), COMPONENT).await;

  match serve(listener, app).await {
    Ok(_) => {
      daemon_logs.info("Server shutdown gracefully", COMPONENT).await;
      Ok(())
    }
    Err(e) => {
      daemon_logs.error(&format!("Server error: {e}"), COMPONENT).await;
      Err(anyhow!("Server error: {}", e))
    }
  }
}
