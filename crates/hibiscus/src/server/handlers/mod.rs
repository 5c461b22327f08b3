//! Endpoint handlers

pub mod classify;
pub mod logs;
pub mod records;
pub mod status;

use axum::{http::StatusCode, response::Json as ResponseJson};
use uuid::Uuid;

use crate::error::HibiscusError;
use crate::server::middleware::RequestContext;
use crate::server::types::ResponseDto;

/// Error half of every handler's return type
pub type ApiError = (StatusCode, ResponseJson<ResponseDto<()>>);

/// Handler result wrapped in the response envelope
pub type ApiResult<T> = Result<ResponseJson<ResponseDto<T>>, ApiError>;

/// HTTP status for a service error
pub fn status_for(error: &HibiscusError) -> StatusCode {
  match error {
    HibiscusError::Validation { .. } => StatusCode::BAD_REQUEST,
    HibiscusError::NotFound { .. } => StatusCode::NOT_FOUND,
    HibiscusError::Conflict { .. } => StatusCode::CONFLICT,
    HibiscusError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

pub fn error_response(
  status: StatusCode,
  message: impl Into<String>,
  transaction_id: Uuid,
) -> ApiError {
  (status, ResponseJson(ResponseDto::error(message, transaction_id)))
}

/// Log a service error against the request and turn it into a response
pub async fn handle_error(
  context: &RequestContext,
  component: &str,
  error: HibiscusError,
) -> ApiError {
  let status = status_for(&error);
  let message = error.to_string();

  if status.is_server_error() {
    context.log_error(&format!("{} ({})", message, error.key()), component).await;
  } else {
    context.log_warn(&format!("{} ({})", message, error.key()), component).await;
  }

  error_response(status, message, context.request_id)
}
