mod common;

use axum::{
  body::{to_bytes, Body},
  http::{Request, StatusCode},
  Router,
};
use bentley::daemon_logs::DaemonLogs;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use reelmatch::config::ReelmatchConfig;
use reelmatch::server::routing::create_router;
use reelmatch::server::startup::AppState;

async fn app(temp: &TempDir) -> Router {
  let logs = DaemonLogs::new_with_silent(temp.path().join("server.logs.jsonl"), true).expect("logs");
  let state = AppState {
    recommender: common::catalogue_recommender().await,
    logs: Arc::new(logs),
    config: Arc::new(ReelmatchConfig::default()),
  };
  create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
  let response = app.oneshot(request).await.expect("response");
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
  (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn post(path: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(path)
    .header("content-type", "application/json")
    .body(Body::from(body.to_string()))
    .expect("request")
}

fn get(path: &str) -> Request<Body> {
  Request::builder().uri(path).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn test_recommend_by_title_endpoint() {
  let temp = TempDir::new().unwrap();

  let (status, body) = send(app(&temp).await, post("/recommend/title", json!({"title": "Heat", "top_n": 1}))).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["titles"], json!(["Ronin"]));
  assert_eq!(body["count"], 1);
  assert!(body["transaction_id"].is_string());
}

#[tokio::test]
async fn test_recommend_by_description_uses_default_top_n() {
  let temp = TempDir::new().unwrap();

  let (status, body) =
    send(app(&temp).await, post("/recommend/description", json!({"description": "lost in space"}))).await;

  assert_eq!(status, StatusCode::OK);
  // The catalogue is smaller than the default of 10
  assert_eq!(body["count"], common::catalogue().len());
  assert_eq!(body["titles"][0], "Alien");
}

#[tokio::test]
async fn test_unknown_title_is_404() {
  let temp = TempDir::new().unwrap();

  let (status, body) = send(app(&temp).await, post("/recommend/title", json!({"title": "The Room"}))).await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["errors"][0]["key"], "not_found");
  assert!(body["errors"][0]["message"].as_str().unwrap_or_default().contains("The Room"));
}

#[tokio::test]
async fn test_invalid_requests_are_400() {
  let temp = TempDir::new().unwrap();

  let (status, body) =
    send(app(&temp).await, post("/recommend/description", json!({"description": "space", "top_n": 0}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "invalid_argument");

  let (status, body) = send(app(&temp).await, post("/recommend/title", json!({"name": "Heat"}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["errors"][0]["key"], "invalid_argument");
}

#[tokio::test]
async fn test_tools_describe_both_entry_points() {
  let temp = TempDir::new().unwrap();

  let (status, body) = send(app(&temp).await, get("/tools")).await;

  assert_eq!(status, StatusCode::OK);
  let names: Vec<&str> = body["tools"].as_array().unwrap().iter().filter_map(|t| t["name"].as_str()).collect();
  assert_eq!(names, vec!["recommend_by_title", "recommend_by_description"]);
}

#[tokio::test]
async fn test_status_reports_collection() {
  let temp = TempDir::new().unwrap();

  let (status, body) = send(app(&temp).await, get("/status")).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "healthy");
  assert_eq!(body["movies"], common::catalogue().len());
  assert_eq!(body["model"], "keyword-test-encoder");
}

#[tokio::test]
async fn test_requests_are_logged_with_context() {
  let temp = TempDir::new().unwrap();
  let router = app(&temp).await;

  send(router.clone(), get("/version")).await;
  let (status, body) = send(router, get("/logs?limit=5")).await;

  assert_eq!(status, StatusCode::OK);
  let logs = body["logs"].as_array().unwrap();
  assert!(logs.iter().any(|entry| entry["context"]["path"] == "/version"
    && entry["context"]["status_code"] == 200));
}
