//! Retrieval service: recommendations by title or by description
//!
//! The only place store and encoder errors are translated into
//! [`RecommendError`]; callers never see a raw backend error.

use std::sync::Arc;

use crate::error::{EncoderError, RecommendError, StoreError};
use crate::server::models::movie::{MetadataFilter, Recommendations};
use crate::server::services::embeddings::SharedEncoder;
use crate::server::services::vector_store::SharedVectorStore;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_MAX_TOP_N: usize = 100;

/// Nearest-neighbor recommendations over a shared store and encoder
#[derive(Clone)]
pub struct Recommender {
  store: SharedVectorStore,
  encoder: SharedEncoder,
  max_top_n: usize,
}

impl Recommender {
  pub fn new(store: SharedVectorStore, encoder: SharedEncoder) -> Self {
    Self { store, encoder, max_top_n: DEFAULT_MAX_TOP_N }
  }

  pub fn with_max_top_n(mut self, max_top_n: usize) -> Self {
    self.max_top_n = max_top_n;
    self
  }

  pub fn max_top_n(&self) -> usize {
    self.max_top_n
  }

  pub fn store(&self) -> &SharedVectorStore {
    &self.store
  }

  pub fn encoder(&self) -> &SharedEncoder {
    &self.encoder
  }

  /// Movies whose embeddings sit closest to the encoded description
  pub async fn recommend_by_description(
    &self,
    description: &str,
    top_n: usize,
  ) -> Result<Recommendations, RecommendError> {
    const OPERATION: &str = "recommend_by_description";
    bentley::verbose!("{OPERATION}: '{description}' (top {top_n})");

    if description.trim().is_empty() {
      return Err(RecommendError::InvalidArgument("description must not be empty".into()));
    }
    self.validate_top_n(top_n)?;

    let vector = self.encode(description).await.map_err(|e| encoder_failure(OPERATION, description, e))?;

    let neighbors = self
      .store
      .query_nearest(&vector, top_n)
      .await
      .map_err(|e| store_failure(OPERATION, description, e))?;

    Ok(neighbors.into_iter().collect())
  }

  /// Movies closest to a stored movie, never including that movie
  pub async fn recommend_by_title(
    &self,
    title: &str,
    top_n: usize,
  ) -> Result<Recommendations, RecommendError> {
    const OPERATION: &str = "recommend_by_title";
    bentley::verbose!("{OPERATION}: '{title}' (top {top_n})");

    if title.trim().is_empty() {
      return Err(RecommendError::InvalidArgument("title must not be empty".into()));
    }
    self.validate_top_n(top_n)?;

    let matches = self
      .store
      .get_by_metadata(&MetadataFilter::title(title), 1)
      .await
      .map_err(|e| store_failure(OPERATION, title, e))?;

    let Some(reference) = matches.into_iter().next() else {
      return Err(RecommendError::NotFound(title.to_string()));
    };

    // One extra neighbor makes room for the reference movie itself
    let neighbors = self
      .store
      .query_nearest(&reference.embedding, top_n.saturating_add(1))
      .await
      .map_err(|e| store_failure(OPERATION, title, e))?;

    Ok(
      neighbors
        .into_iter()
        .filter(|neighbor| neighbor.record.title != title)
        .take(top_n)
        .collect(),
    )
  }

  fn validate_top_n(&self, top_n: usize) -> Result<(), RecommendError> {
    if top_n == 0 || top_n > self.max_top_n {
      return Err(RecommendError::InvalidArgument(format!(
        "top_n must be between 1 and {}, got {top_n}",
        self.max_top_n
      )));
    }
    Ok(())
  }

  /// Encoding is CPU-bound, so it runs on the blocking pool
  async fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    let encoder = Arc::clone(&self.encoder);
    let text = text.to_string();

    tokio::task::spawn_blocking(move || encoder.encode(&text))
      .await
      .map_err(|e| EncoderError::Unavailable(format!("encoding task failed: {e}")))?
  }
}

fn store_failure(operation: &str, input: &str, error: StoreError) -> RecommendError {
  match error {
    StoreError::StorageUnavailable(reason) => {
      bentley::warn!("{operation} ('{input}'): storage unavailable: {reason}");
      RecommendError::ServiceUnavailable(reason)
    }
    StoreError::DimensionMismatch { expected, actual } => {
      RecommendError::DimensionMismatch { expected, actual }
    }
    StoreError::InvalidArgument(reason) => RecommendError::InvalidArgument(reason),
    other => {
      bentley::error!("{operation} ('{input}') failed: {other}");
      RecommendError::Unexpected
    }
  }
}

fn encoder_failure(operation: &str, input: &str, error: EncoderError) -> RecommendError {
  match error {
    EncoderError::Unavailable(reason) | EncoderError::ModelLoad(reason) => {
      bentley::warn!("{operation} ('{input}'): encoder unavailable: {reason}");
      RecommendError::ServiceUnavailable(reason)
    }
    EncoderError::Inference(reason) => {
      bentley::error!("{operation} ('{input}') failed: {reason}");
      RecommendError::Unexpected
    }
  }
}
