//! Hibiscus - cultivar classification over a vector-indexed trait knowledge base
//!
//! Given leaf characteristics (tip shape, serration, length range and so
//! on), every known trait is searched concurrently in its own partition of
//! the vector index and the per-trait matches are folded into a ranked list
//! of candidate species, each with a per-trait score breakdown.

pub mod attributes;
pub mod chunking;
pub mod config;
pub mod error;
pub mod server;

pub use attributes::{Attribute, AttributeQuery, AttributeValue};
pub use config::HibiscusConfig;
pub use error::{HibiscusError, Result};
