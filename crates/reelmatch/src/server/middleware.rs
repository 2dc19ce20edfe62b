//! Request context and middleware for the reelmatch REST API
//!
//! Every request gets a [`RequestContext`] in its extensions carrying a
//! request id and the shared daemon logger.

use axum::{
  extract::{Request, State},
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use bentley::daemon_logs::{DaemonLogs, LogContext};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::server::startup::AppState;

/// Request context containing logger and request metadata
#[derive(Clone)]
pub struct RequestContext {
  /// Unique ID for this request, reused as the response transaction id
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub logger: Arc<DaemonLogs>,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, logger: Arc<DaemonLogs>) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, logger }
  }

  pub async fn log_success(&self, message: &str, component: &str) {
    self.log_with_context("success", message, component, None, None).await;
  }

  pub async fn log_warn(&self, message: &str, component: &str) {
    self.log_with_context("warn", message, component, None, None).await;
  }

  pub async fn log_error(&self, message: &str, component: &str) {
    self.log_with_context("error", message, component, None, None).await;
  }

  /// Log with the request's id, method, and path attached
  pub async fn log_with_context(
    &self,
    level: &str,
    message: &str,
    component: &str,
    status_code: Option<u16>,
    duration_ms: Option<f64>,
  ) {
    let context = LogContext {
      request_id: Some(self.request_id.to_string()),
      method: Some(self.method.to_string()),
      path: Some(self.uri.path().to_string()),
      duration_ms,
      status_code,
    };
    self.logger.log(level, message, component, Some(context)).await;
  }
}

/// Middleware to inject RequestContext into all requests
pub async fn request_context_middleware(
  State(state): State<AppState>,
  mut request: Request,
  next: Next,
) -> Response {
  let context =
    RequestContext::new(request.method().clone(), request.uri().clone(), Arc::clone(&state.logs));

  let start_time = Instant::now();
  context.log_with_context("info", "Request started", "http-request", None, None).await;

  request.extensions_mut().insert(context.clone());
  let response = next.run(request).await;

  let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
  let status = response.status().as_u16();
  let level = if response.status().is_server_error() { "error" } else { "info" };
  context
    .log_with_context(level, "Request completed", "http-request", Some(status), Some(duration_ms))
    .await;

  response
}
