//! Logs endpoint handler

use axum::{
  extract::{Extension, Query},
  http::StatusCode,
  response::Json,
};
use bentley::daemon_logs::LogQuery;
use bentley::Level;

use crate::server::handlers::{error_response, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::types::{LogsQuery, LogsResponse, ResponseDto};

const DEFAULT_LOG_LIMIT: usize = 100;

/// GET /logs - Newest request log entries
pub async fn get_logs(
  Extension(context): Extension<RequestContext>,
  Query(query): Query<LogsQuery>,
) -> ApiResult<LogsResponse> {
  let level = match query.level.as_deref().map(|name| (name, Level::parse(name))) {
    None => None,
    Some((_, Some(level))) => Some(level),
    Some((name, None)) => {
      return Err(error_response(
        StatusCode::BAD_REQUEST,
        format!("Unknown log level '{name}'"),
        context.request_id,
      ))
    }
  };

  let log_query =
    LogQuery { limit: Some(query.limit.unwrap_or(DEFAULT_LOG_LIMIT)), level, component: None };
  match context.logger.get_logs(&log_query).await {
    Ok(logs) => {
      let message = format!("Retrieved {} log entries.", logs.len());
      Ok(Json(ResponseDto::success(message, LogsResponse { logs }, context.request_id)))
    }
    Err(e) => {
      context.log_error(&format!("Failed to read logs: {e}"), "logs-api").await;
      Err(error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to read logs: {e}"),
        context.request_id,
      ))
    }
  }
}
