//! Services backing the REST surface

pub mod aggregator;
pub mod classifier;
pub mod embeddings;
pub mod ingestion;
#[cfg(feature = "lancedb")]
pub mod lancedb;
pub mod memory;
pub mod records;
pub mod vector_database;
