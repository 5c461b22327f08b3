//! REST API module for the hibiscus classification service
//!
//! Provides the HTTP endpoints for record ingestion, administration and
//! species classification. Uses axum for routing and schemars for OpenAPI
//! documentation generation.

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod services;
pub mod startup;
pub mod state;
pub mod types;
