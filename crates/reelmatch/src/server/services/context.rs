//! Process-wide collaborators, built once at startup

use std::sync::Arc;

use crate::config::ReelmatchConfig;
use crate::error::RecommendError;
use crate::server::services::embeddings::{OnnxEncoder, SharedEncoder};
use crate::server::services::lancedb::LanceDbMovieStore;
use crate::server::services::recommender::Recommender;
use crate::server::services::vector_store::SharedVectorStore;

/// Store and encoder shared by every request
#[derive(Clone)]
pub struct AppContext {
  store: SharedVectorStore,
  encoder: SharedEncoder,
  max_top_n: usize,
}

impl AppContext {
  /// Wire up already-built collaborators
  ///
  /// Fails if the encoder and the collection disagree on dimension.
  pub fn new(
    store: SharedVectorStore,
    encoder: SharedEncoder,
    max_top_n: usize,
  ) -> Result<Self, RecommendError> {
    if store.dimension() != encoder.dimension() {
      return Err(RecommendError::InitializationFailure(format!(
        "encoder '{}' produces {}-dimensional vectors but the collection stores {}",
        encoder.model_name(),
        encoder.dimension(),
        store.dimension()
      )));
    }
    Ok(Self { store, encoder, max_top_n })
  }

  /// Open the configured store and load the embedding model
  pub async fn initialize(config: &ReelmatchConfig) -> Result<Self, RecommendError> {
    let store = open_store(config).await?;
    let encoder = OnnxEncoder::load(&config.model)
      .await
      .map_err(|e| RecommendError::InitializationFailure(e.to_string()))?;

    Self::new(store, Arc::new(encoder), config.max_top_n)
  }

  pub fn store(&self) -> &SharedVectorStore {
    &self.store
  }

  pub fn encoder(&self) -> &SharedEncoder {
    &self.encoder
  }

  pub fn recommender(&self) -> Recommender {
    Recommender::new(Arc::clone(&self.store), Arc::clone(&self.encoder)).with_max_top_n(self.max_top_n)
  }
}

/// Open the configured collection without loading a model
pub async fn open_store(config: &ReelmatchConfig) -> Result<SharedVectorStore, RecommendError> {
  let store = LanceDbMovieStore::open(&config.storage_dir(), &config.collection, config.dimension)
    .await
    .map_err(|e| RecommendError::InitializationFailure(e.to_string()))?;
  Ok(Arc::new(store))
}
