//! Endpoint handlers

pub mod logs;
pub mod recommend;
pub mod status;
pub mod tools;

use axum::{http::StatusCode, response::Json};
use uuid::Uuid;

use crate::error::RecommendError;
use crate::server::types::{ApiError, BaseResponse};

/// Error half of every handler result
pub type ErrorResponse = (StatusCode, Json<BaseResponse<()>>);

pub type ApiResult<T> = Result<Json<BaseResponse<T>>, ErrorResponse>;

pub fn error_response(status: StatusCode, error: ApiError, transaction_id: Uuid) -> ErrorResponse {
  (status, Json(BaseResponse::<()>::error(vec![error], transaction_id)))
}

/// HTTP status for each recommendation error kind
pub fn status_for(error: &RecommendError) -> StatusCode {
  match error {
    RecommendError::NotFound(_) => StatusCode::NOT_FOUND,
    RecommendError::InvalidArgument(_) | RecommendError::DimensionMismatch { .. } => {
      StatusCode::BAD_REQUEST
    }
    RecommendError::ServiceUnavailable(_) | RecommendError::InitializationFailure(_) => {
      StatusCode::SERVICE_UNAVAILABLE
    }
    RecommendError::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
  }
}
