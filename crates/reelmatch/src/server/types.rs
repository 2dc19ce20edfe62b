//! REST API types with schemars annotations for tool descriptors

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecommendError;
use crate::server::models::movie::Recommendations;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

/// API versioning information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  /// The latest version of the API
  pub latest: String,

  /// The version of the API requested by the client
  pub requested: String,

  /// The version of the API that was used in producing the response
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, stable across releases
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

// Status/Version Endpoints
// =======================

/// Response for /version endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  /// Current API version
  pub version: String,
}

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  /// Collection being served
  pub collection: String,
  /// Number of movies in the collection
  pub movies: usize,
  /// Embedding dimension of the collection
  pub dimension: usize,
  /// Embedding model used for descriptions
  pub model: String,
}

// Logs Endpoint
// =============

/// Query parameters for /logs
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsQuery {
  /// Maximum number of entries, most recent kept
  #[serde(default)]
  pub limit: Option<usize>,

  /// Level filter (info, warn, error, success, all)
  #[serde(default)]
  pub level: Option<String>,
}

/// Response for /logs endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  /// JSON log entries
  pub logs: Vec<LogEntry>,
}

/// Individual log entry (re-exported from bentley)
pub type LogEntry = bentley::daemon_logs::LogEntry;

// Recommendation Endpoints
// ========================

/// Request for /recommend/title
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecommendByTitleRequest {
  /// Exact title of a movie the user already knows
  pub title: String,

  /// How many recommendations to return (defaults to 10)
  #[serde(default)]
  pub top_n: Option<usize>,
}

/// Request for /recommend/description
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecommendByDescriptionRequest {
  /// Free-text description of the kind of movie wanted
  pub description: String,

  /// How many recommendations to return (defaults to 10)
  #[serde(default)]
  pub top_n: Option<usize>,
}

/// Response for both recommendation endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationsResponse {
  /// Titles, nearest first
  pub titles: Vec<String>,

  /// Titles with their distance from the query
  pub recommendations: Vec<RecommendationData>,

  pub count: usize,
}

/// One recommended movie
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecommendationData {
  pub title: String,
  /// Squared L2 distance from the query vector
  pub distance: f32,
}

// Tools Endpoint
// ==============

/// A callable operation described for a conversational agent
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ToolDescriptor {
  pub name: String,
  pub description: String,
  pub method: String,
  pub path: String,
  /// JSON schema of the request body
  pub input_schema: serde_json::Value,
}

/// Response for /tools
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ToolsResponse {
  pub tools: Vec<ToolDescriptor>,
}

// Helper Functions
// ================

impl<T> BaseResponse<T> {
  /// Create a successful response
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: VersionInfo::current(), transaction_id, errors: Vec::new(), data }
  }

  /// Create an error response
  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: VersionInfo::current(), transaction_id, errors, data: () }
  }
}

impl VersionInfo {
  fn current() -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self {
      latest: version.to_string(),
      requested: version.to_string(),
      resolved: version.to_string(),
    }
  }
}

impl ApiError {
  /// Create a new API error
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), context: serde_json::Value::Null }
  }

  pub fn with_context(mut self, context: serde_json::Value) -> Self {
    self.context = context;
    self
  }
}

impl From<&RecommendError> for ApiError {
  fn from(error: &RecommendError) -> Self {
    let api_error = ApiError::new(error.key(), &error.user_message());
    match error {
      RecommendError::NotFound(title) => api_error.with_context(serde_json::json!({ "title": title })),
      RecommendError::DimensionMismatch { expected, actual } => {
        api_error.with_context(serde_json::json!({ "expected": expected, "actual": actual }))
      }
      _ => api_error,
    }
  }
}

impl From<Recommendations> for RecommendationsResponse {
  fn from(recommendations: Recommendations) -> Self {
    let recommendations: Vec<RecommendationData> = recommendations
      .entries
      .into_iter()
      .map(|entry| RecommendationData { title: entry.title, distance: entry.distance })
      .collect();

    Self {
      titles: recommendations.iter().map(|r| r.title.clone()).collect(),
      count: recommendations.len(),
      recommendations,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::server::models::movie::Recommendation;

  #[test]
  fn test_error_envelope_shape() -> anyhow::Result<()> {
    let error = ApiError::from(&RecommendError::NotFound("Heat".into()));
    let response = BaseResponse::<()>::error(vec![error], Uuid::new_v4());
    let json = serde_json::to_value(&response)?;

    assert_eq!(json["errors"][0]["key"], "not_found");
    assert_eq!(json["errors"][0]["context"]["title"], "Heat");
    assert!(json["versioning"]["latest"].is_string());
    Ok(())
  }

  #[test]
  fn test_success_envelope_flattens_data() -> anyhow::Result<()> {
    let recommendations = Recommendations {
      entries: vec![
        Recommendation { title: "Ronin".into(), distance: 0.1 },
        Recommendation { title: "Thief".into(), distance: 0.2 },
      ],
    };
    let response = BaseResponse::success(RecommendationsResponse::from(recommendations), Uuid::new_v4());
    let json = serde_json::to_value(&response)?;

    assert_eq!(json["titles"], serde_json::json!(["Ronin", "Thief"]));
    assert_eq!(json["count"], 2);
    assert!(json.get("errors").is_none());
    Ok(())
  }

  #[test]
  fn test_top_n_is_optional() -> anyhow::Result<()> {
    let request: RecommendByTitleRequest = serde_json::from_str(r#"{"title": "Heat"}"#)?;
    assert_eq!(request.top_n, None);
    Ok(())
  }
}
