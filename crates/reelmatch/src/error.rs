//! Error taxonomy for the store, encoder, loader, and recommendation layers

use thiserror::Error;

/// Failures raised by a [`VectorStore`](crate::server::services::vector_store::VectorStore)
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),

  #[error("embedding has {actual} dimensions, collection expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("id already exists: {0}")]
  IdCollision(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("storage backend error: {0}")]
  Backend(String),
}

/// Failures raised by a [`TextEncoder`](crate::server::services::embeddings::TextEncoder)
#[derive(Debug, Error)]
pub enum EncoderError {
  #[error("failed to load embedding model: {0}")]
  ModelLoad(String),

  #[error("embedding model unavailable: {0}")]
  Unavailable(String),

  #[error("failed to encode text: {0}")]
  Inference(String),
}

/// Failures raised while bulk loading precomputed embeddings
#[derive(Debug, Error)]
pub enum IngestError {
  #[error("embedding matrix has {embeddings} rows but title table has {titles}")]
  RowCountMismatch { embeddings: usize, titles: usize },

  #[error("nothing to ingest: {0}")]
  Empty(String),

  #[error("failed to read {path}: {reason}")]
  Read { path: String, reason: String },

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Errors returned across the recommendation boundary
///
/// Storage and encoder failures are converted into one of these kinds before
/// they leave the service; nothing else escapes.
#[derive(Debug, Error, PartialEq)]
pub enum RecommendError {
  #[error("initialization failed: {0}")]
  InitializationFailure(String),

  #[error("movie not found: {0}")]
  NotFound(String),

  #[error("query vector has {actual} dimensions, collection expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("service unavailable: {0}")]
  ServiceUnavailable(String),

  #[error("something went wrong while finding recommendations")]
  Unexpected,
}

impl RecommendError {
  /// Stable machine-readable key for API responses
  pub fn key(&self) -> &'static str {
    match self {
      RecommendError::InitializationFailure(_) => "initialization_failure",
      RecommendError::NotFound(_) => "not_found",
      RecommendError::DimensionMismatch { .. } => "dimension_mismatch",
      RecommendError::InvalidArgument(_) => "invalid_argument",
      RecommendError::ServiceUnavailable(_) => "service_unavailable",
      RecommendError::Unexpected => "unexpected",
    }
  }

  /// Message suitable for showing to the person asking for recommendations
  pub fn user_message(&self) -> String {
    match self {
      RecommendError::NotFound(title) => {
        format!("I can't find related movies to '{title}' because it isn't in my database.")
      }
      other => other.to_string(),
    }
  }
}
