//! Request context and middleware for the hibiscus REST API
//!
//! Every request gets an id and a handle to the shared request log, injected
//! as an extension. Start and completion are logged with method, path,
//! status and duration.

use axum::{
  extract::{Request, State},
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use bentley::daemon_logs::{DaemonLogs, LogContext};
use bentley::Level;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::server::state::AppState;

/// Request context containing logger and request metadata
#[derive(Clone)]
pub struct RequestContext {
  /// Unique ID for this request, echoed as the transaction id
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub logger: Arc<DaemonLogs>,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, logger: Arc<DaemonLogs>) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, logger }
  }

  pub async fn log_success(&self, message: &str, component: &str) {
    self.log(Level::Success, message, component, None, None).await;
  }

  pub async fn log_warn(&self, message: &str, component: &str) {
    self.log(Level::Warn, message, component, None, None).await;
  }

  pub async fn log_error(&self, message: &str, component: &str) {
    self.log(Level::Error, message, component, None, None).await;
  }

  /// Log with the request's id, method and path attached
  pub async fn log(
    &self,
    level: Level,
    message: &str,
    component: &str,
    status_code: Option<u16>,
    duration_ms: Option<f64>,
  ) {
    let context = LogContext {
      request_id: Some(self.request_id.to_string()),
      method: Some(self.method.to_string()),
      path: Some(self.uri.path().to_string()),
      duration_ms,
      status_code,
    };
    self.logger.log_with_context(level, message, component, context).await;
  }

  pub async fn log_request_start(&self) {
    self.log(Level::Verbose, "Request started", "http-request", None, None).await;
  }

  pub async fn log_request_complete(&self, status_code: u16, duration_ms: f64) {
    let level = match status_code {
      500.. => Level::Error,
      400..=499 => Level::Warn,
      _ => Level::Info,
    };
    self
      .log(level, "Request completed", "http-request", Some(status_code), Some(duration_ms))
      .await;
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(
  State(state): State<AppState>,
  mut request: Request,
  next: Next,
) -> Response {
  let context =
    RequestContext::new(request.method().clone(), request.uri().clone(), state.logs.clone());

  let start_time = Instant::now();
  context.log_request_start().await;

  request.extensions_mut().insert(context.clone());
  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  context.log_request_complete(response.status().as_u16(), duration_ms).await;

  response
}
