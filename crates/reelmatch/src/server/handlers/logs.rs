//! Logs endpoint handler

use axum::{
  extract::{Extension, Query},
  http::StatusCode,
  response::Json,
};

use super::{error_response, ApiResult};
use crate::server::middleware::RequestContext;
use crate::server::types::{ApiError, BaseResponse, LogsQuery, LogsResponse};

const DEFAULT_LIMIT: usize = 100;

/// GET /logs - Recent server log entries
pub async fn get_logs(
  Extension(context): Extension<RequestContext>,
  Query(query): Query<LogsQuery>,
) -> ApiResult<LogsResponse> {
  let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

  match context.logger.get_logs(Some(limit), query.level.as_deref()).await {
    Ok(logs) => Ok(Json(BaseResponse::success(LogsResponse { logs }, context.request_id))),
    Err(e) => {
      context.log_error(&format!("Failed to read logs: {e}"), "logs-api").await;
      let error = ApiError::new("logs_read_failed", &format!("Failed to read logs: {e}"));
      Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, error, context.request_id))
    }
  }
}
