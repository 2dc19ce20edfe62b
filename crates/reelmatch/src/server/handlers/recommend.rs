//! Recommendation endpoint handlers

use axum::{
  extract::{rejection::JsonRejection, Extension, State},
  http::StatusCode,
  response::Json,
};

use super::{error_response, status_for, ApiResult};
use crate::error::RecommendError;
use crate::server::middleware::RequestContext;
use crate::server::models::movie::Recommendations;
use crate::server::startup::AppState;
use crate::server::types::{
  ApiError, BaseResponse, RecommendByDescriptionRequest, RecommendByTitleRequest,
  RecommendationsResponse,
};

const COMPONENT: &str = "recommend-api";

/// POST /recommend/title - Movies similar to a known title
pub async fn recommend_by_title(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<RecommendByTitleRequest>, JsonRejection>,
) -> ApiResult<RecommendationsResponse> {
  let Json(request) = payload.map_err(|e| bad_body(&context, e))?;
  let top_n = request.top_n.unwrap_or(state.config.default_top_n);

  let result = state.recommender.recommend_by_title(&request.title, top_n).await;
  respond(&context, &format!("title '{}'", request.title), result).await
}

/// POST /recommend/description - Movies matching a free-text description
pub async fn recommend_by_description(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  payload: Result<Json<RecommendByDescriptionRequest>, JsonRejection>,
) -> ApiResult<RecommendationsResponse> {
  let Json(request) = payload.map_err(|e| bad_body(&context, e))?;
  let top_n = request.top_n.unwrap_or(state.config.default_top_n);

  let result = state.recommender.recommend_by_description(&request.description, top_n).await;
  respond(&context, &format!("description '{}'", request.description), result).await
}

async fn respond(
  context: &RequestContext,
  query: &str,
  result: Result<Recommendations, RecommendError>,
) -> ApiResult<RecommendationsResponse> {
  match result {
    Ok(recommendations) => {
      context
        .log_success(&format!("{} recommendations for {query}", recommendations.len()), COMPONENT)
        .await;
      Ok(Json(BaseResponse::success(recommendations.into(), context.request_id)))
    }
    Err(e) => {
      let status = status_for(&e);
      let message = format!("Recommendation for {query} failed: {e}");
      if status.is_server_error() {
        context.log_error(&message, COMPONENT).await;
      } else {
        context.log_warn(&message, COMPONENT).await;
      }
      Err(error_response(status, ApiError::from(&e), context.request_id))
    }
  }
}

fn bad_body(context: &RequestContext, rejection: JsonRejection) -> super::ErrorResponse {
  let error = ApiError::new("invalid_argument", &format!("Invalid request body: {}", rejection.body_text()));
  error_response(StatusCode::BAD_REQUEST, error, context.request_id)
}
