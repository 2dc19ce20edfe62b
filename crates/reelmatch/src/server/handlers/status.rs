//! Status and version endpoint handlers

use axum::{
  extract::{Extension, State},
  http::StatusCode,
  response::Json,
};

use super::{error_response, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::startup::AppState;
use crate::server::types::{ApiError, BaseResponse, StatusResponse, VersionResponse};

/// GET /status - Health check endpoint
pub async fn status(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
) -> ApiResult<StatusResponse> {
  let store = state.recommender.store();

  match store.count().await {
    Ok(movies) => {
      let response = StatusResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: state.config.collection.clone(),
        movies,
        dimension: store.dimension(),
        model: state.recommender.encoder().model_name().to_string(),
      };
      Ok(Json(BaseResponse::success(response, context.request_id)))
    }
    Err(e) => {
      context.log_error(&format!("Status check failed: {e}"), "status-api").await;
      let error = ApiError::new("service_unavailable", &format!("Store is not readable: {e}"));
      Err(error_response(StatusCode::SERVICE_UNAVAILABLE, error, context.request_id))
    }
  }
}

/// GET /version - Returns current API version
pub async fn version(Extension(context): Extension<RequestContext>) -> Json<BaseResponse<VersionResponse>> {
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };
  Json(BaseResponse::success(response, context.request_id))
}
