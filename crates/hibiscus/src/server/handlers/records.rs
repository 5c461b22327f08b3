//! Record creation, lookup and deletion handlers

use axum::{
  extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Json, Query, State,
  },
  http::StatusCode,
  response::Json as ResponseJson,
};

use crate::attributes::Attribute;
use crate::error::HibiscusError;
use crate::server::handlers::{error_response, handle_error, ApiError, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::services::ingestion::{CreateRangeRecord, CreateRecord, IngestReport};
use crate::server::state::AppState;
use crate::server::types::{
  ColumnQuery, CreateRecordResponse, DeleteColumnResponse, ResponseDto, SheetUploadRequest,
  TitleQuery, TitleRecordsResponse,
};

const COMPONENT: &str = "records-api";

fn bad_request(context: &RequestContext, message: String) -> ApiError {
  error_response(StatusCode::BAD_REQUEST, message, context.request_id)
}

/// POST /pinecone/createRecord - Store one descriptive record
pub async fn create_record(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<CreateRecord>, JsonRejection>,
) -> ApiResult<CreateRecordResponse> {
  let Json(request) = payload.map_err(|e| bad_request(&context, e.body_text()))?;
  let (index, title) = (request.index.clone(), request.title.clone());

  match state.ingestion.create_record(request).await {
    Ok(records) => {
      let summary = format!("Created {records} record(s) for '{title}' in '{index}'");
      context.log_success(&summary, COMPONENT).await;
      Ok(ResponseJson(ResponseDto::success(
        format!("Succeeded in creating a record in the {index} index."),
        CreateRecordResponse { records },
        context.request_id,
      )))
    }
    Err(e) => Err(handle_error(&context, COMPONENT, e).await),
  }
}

/// POST /pinecone/createRangeRecord - Store one range record
pub async fn create_range_record(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<CreateRangeRecord>, JsonRejection>,
) -> ApiResult<CreateRecordResponse> {
  let Json(request) = payload.map_err(|e| bad_request(&context, e.body_text()))?;
  let (index, title) = (request.index.clone(), request.title.clone());

  match state.ingestion.create_range_record(request).await {
    Ok(records) => {
      let summary = format!("Created range record for '{title}' in '{index}'");
      context.log_success(&summary, COMPONENT).await;
      Ok(ResponseJson(ResponseDto::success(
        format!("Succeeded in creating a record in the {index} index."),
        CreateRecordResponse { records },
        context.request_id,
      )))
    }
    Err(e) => Err(handle_error(&context, COMPONENT, e).await),
  }
}

/// POST /pinecone/createRecordsWithExcel{Attribute} - Ingest one attribute's sheet
pub async fn create_records_with_sheet(
  attribute: Attribute,
  state: AppState,
  context: RequestContext,
  payload: Result<Json<SheetUploadRequest>, JsonRejection>,
) -> ApiResult<IngestReport> {
  let Json(request) = payload.map_err(|e| bad_request(&context, e.body_text()))?;
  let (index, sheet) = request.into_parts();

  match state.ingestion.ingest_sheet(attribute, &index, &sheet).await {
    Ok(report) => {
      let summary = format!(
        "Ingested {attribute} sheet: {} rows, {} skipped, {} records",
        report.rows, report.skipped, report.records
      );
      context.log_success(&summary, COMPONENT).await;
      Ok(ResponseJson(ResponseDto::success(
        format!(
          "Succeeded in creating {} {attribute} record(s) in the {index} index.",
          report.records
        ),
        report,
        context.request_id,
      )))
    }
    Err(e) => Err(handle_error(&context, COMPONENT, e).await),
  }
}

/// GET /pinecone/queryWithTitle - Every record stored for a title
pub async fn query_with_title(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  query: Result<Query<TitleQuery>, QueryRejection>,
) -> ApiResult<TitleRecordsResponse> {
  let Query(query) = query.map_err(|e| bad_request(&context, e.body_text()))?;

  match state.records.query_by_title(&query.index, &query.title).await {
    Ok(records) if records.is_empty() => {
      let error = HibiscusError::not_found(format!("records for '{}'", query.title));
      Err(handle_error(&context, COMPONENT, error).await)
    }
    Ok(records) => Ok(ResponseJson(ResponseDto::success(
      format!("Found {} record(s) for '{}'.", records.len(), query.title),
      TitleRecordsResponse { title: query.title, records },
      context.request_id,
    ))),
    Err(e) => Err(handle_error(&context, COMPONENT, e).await),
  }
}

/// DELETE /pinecone/deleteColumn - Remove every record tagged with a column
pub async fn delete_column(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  query: Result<Query<ColumnQuery>, QueryRejection>,
) -> ApiResult<DeleteColumnResponse> {
  let Query(query) = query.map_err(|e| bad_request(&context, e.body_text()))?;

  match state.records.delete_by_column(&query.index, &query.column).await {
    Ok(deleted) => {
      let summary = format!("Deleted {deleted} record(s) from column '{}'", query.column);
      context.log_success(&summary, COMPONENT).await;
      Ok(ResponseJson(ResponseDto::success(
        format!("Deleted {deleted} record(s) from column '{}'.", query.column),
        DeleteColumnResponse { column: query.column, deleted },
        context.request_id,
      )))
    }
    Err(e) => Err(handle_error(&context, COMPONENT, e).await),
  }
}
