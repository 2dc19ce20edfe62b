//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{logs, recommend, status, tools};
use crate::server::middleware::request_context_middleware;
use crate::server::startup::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/logs", get(logs::get_logs))
    // Tool-call boundary for conversational agents
    .route("/tools", get(tools::list_tools))
    .route("/recommend/title", post(recommend::recommend_by_title))
    .route("/recommend/description", post(recommend::recommend_by_description))
    .layer(middleware::from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}
