//! Axum router configuration for all endpoints

use axum::{
  extract::{rejection::JsonRejection, Extension, Json, State},
  middleware,
  routing::{delete, get, post},
  Router,
};

use crate::attributes::Attribute;
use crate::server::handlers::{classify, logs, records, status};
use crate::server::middleware::{request_context_middleware, RequestContext};
use crate::server::state::AppState;
use crate::server::types::SheetUploadRequest;

/// Path of the spreadsheet upload route for an attribute
pub fn sheet_route(attribute: Attribute) -> String {
  format!("/pinecone/createRecordsWithExcel{}", attribute.route_suffix())
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  let router = Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/logs", get(logs::get_logs))
    // Record endpoints
    .route("/pinecone/createRecord", post(records::create_record))
    .route("/pinecone/createRangeRecord", post(records::create_range_record))
    .route("/pinecone/queryWithTitle", get(records::query_with_title))
    .route("/pinecone/deleteColumn", delete(records::delete_column))
    // Classification
    .route("/pinecone/queryPinecone", get(classify::query_species));

  Attribute::ALL
    .into_iter()
    .fold(router, |router, attribute| {
      router.route(
        &sheet_route(attribute),
        post(
          move |State(state): State<AppState>,
                Extension(context): Extension<RequestContext>,
                payload: Result<Json<SheetUploadRequest>, JsonRejection>| {
            records::create_records_with_sheet(attribute, state, context, payload)
          },
        ),
      )
    })
    .layer(middleware::from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sheet_routes_are_unique() {
    let mut routes: Vec<String> = Attribute::ALL.into_iter().map(sheet_route).collect();
    routes.sort();
    routes.dedup();
    assert_eq!(routes.len(), 12);
    assert!(routes.contains(&"/pinecone/createRecordsWithExcelLeafTip".to_string()));
  }
}
