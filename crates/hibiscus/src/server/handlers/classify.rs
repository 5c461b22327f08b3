//! Classification endpoint handler

use axum::{
  extract::{Extension, Query, State},
  response::Json,
};
use std::collections::HashMap;

use crate::attributes::AttributeQuery;
use crate::error::HibiscusError;
use crate::server::handlers::{handle_error, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::services::aggregator::RankedSpeciesResult;
use crate::server::state::AppState;
use crate::server::types::ResponseDto;

const COMPONENT: &str = "classify-api";

/// GET /pinecone/queryPinecone - Rank species matching the given leaf traits
///
/// Every attribute is an optional query parameter; omitted ones are unknown
/// (`shape` defaults to 단엽). Ranges: leaflet_count -1 ~ 25,
/// leaf_length -1 ~ 50, leaf_width -1 ~ 30.
pub async fn query_species(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Query(params): Query<HashMap<String, String>>,
) -> ApiResult<RankedSpeciesResult> {
  let query = match AttributeQuery::from_params(&params) {
    Ok(query) => query,
    Err(e) => return Err(handle_error(&context, COMPONENT, e).await),
  };

  let known = query.known().count();
  let result = state.classifier.classify(&query).await;
  if result.is_empty() {
    let error = HibiscusError::not_found("species matching the given characteristics");
    return Err(handle_error(&context, COMPONENT, error).await);
  }

  let summary = format!("Ranked {} species from {known} known attribute(s)", result.len());
  context.log_success(&summary, COMPONENT).await;
  Ok(Json(ResponseDto::success(
    "Succeeded in inferring the species that are similar to the input image.",
    result,
    context.request_id,
  )))
}
