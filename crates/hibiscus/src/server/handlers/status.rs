//! Status and version endpoint handlers

use axum::{
  extract::{Extension, State},
  response::Json,
};

use crate::server::handlers::{handle_error, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::state::AppState;
use crate::server::types::{ResponseDto, StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> ApiResult<StatusResponse> {
  let indexes = match state.store.list_indexes().await {
    Ok(indexes) => indexes,
    Err(e) => return Err(handle_error(&context, "status-api", e).await),
  };

  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    indexes,
  };
  Ok(Json(ResponseDto::success("Service is healthy.", response, context.request_id)))
}

/// GET /version - Returns current API version
pub async fn version(
  Extension(context): Extension<RequestContext>,
) -> Json<ResponseDto<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(ResponseDto::success("Current API version.", response, context.request_id))
}
