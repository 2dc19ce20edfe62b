//! Tool descriptors for conversational agents

use axum::{extract::Extension, response::Json};
use schemars::{schema_for, JsonSchema};

use crate::server::middleware::RequestContext;
use crate::server::types::{
  BaseResponse, RecommendByDescriptionRequest, RecommendByTitleRequest, ToolDescriptor,
  ToolsResponse,
};

/// GET /tools - Describe both recommendation entry points
pub async fn list_tools(Extension(context): Extension<RequestContext>) -> Json<BaseResponse<ToolsResponse>> {
  Json(BaseResponse::success(ToolsResponse { tools: tool_descriptors() }, context.request_id))
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
  vec![
    descriptor::<RecommendByTitleRequest>(
      "recommend_by_title",
      "Recommend movies similar to a movie the user names. Use when the user mentions a specific title they liked.",
      "/recommend/title",
    ),
    descriptor::<RecommendByDescriptionRequest>(
      "recommend_by_description",
      "Recommend movies matching a description of plot, mood, or genre. Use when the user describes what they want to watch.",
      "/recommend/description",
    ),
  ]
}

fn descriptor<T: JsonSchema>(name: &str, description: &str, path: &str) -> ToolDescriptor {
  ToolDescriptor {
    name: name.to_string(),
    description: description.to_string(),
    method: "POST".to_string(),
    path: path.to_string(),
    input_schema: serde_json::to_value(schema_for!(T)).unwrap_or_default(),
  }
}
