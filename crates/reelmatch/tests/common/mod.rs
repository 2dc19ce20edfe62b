#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use reelmatch::error::{EncoderError, StoreError};
use reelmatch::server::models::movie::{MetadataFilter, MovieMetadata, MovieRecord, Neighbor};
use reelmatch::server::services::embeddings::TextEncoder;
use reelmatch::server::services::recommender::Recommender;
use reelmatch::server::services::vector_store::{
  order_neighbors, validate_batch, validate_query_vector, VectorStore,
};

/// Brute-force store kept in memory
pub struct InMemoryStore {
  dimension: usize,
  records: RwLock<Vec<MovieRecord>>,
}

impl InMemoryStore {
  pub fn new(dimension: usize) -> Self {
    Self { dimension, records: RwLock::new(Vec::new()) }
  }

  /// Store seeded with `(title, embedding)` pairs, ids by position
  pub async fn with_movies(dimension: usize, movies: &[(&str, Vec<f32>)]) -> Arc<Self> {
    let store = Self::new(dimension);
    let ids: Vec<String> = (0..movies.len()).map(|i| i.to_string()).collect();
    let embeddings: Vec<Vec<f32>> = movies.iter().map(|(_, e)| e.clone()).collect();
    let metadatas: Vec<MovieMetadata> = movies.iter().map(|(t, _)| MovieMetadata::new(*t)).collect();
    store.bulk_insert(&ids, &embeddings, &metadatas).await.expect("seed store");
    Arc::new(store)
  }
}

/// Exact match on every filter field
fn filter_matches(filter: &MetadataFilter, record: &MovieRecord) -> bool {
  filter.fields().all(|(field, value)| match field {
    "id" => record.id == value,
    "title" => record.title == value,
    _ => false,
  })
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorStore for InMemoryStore {
  fn dimension(&self) -> usize {
    self.dimension
  }

  async fn bulk_insert(
    &self,
    ids: &[String],
    embeddings: &[Vec<f32>],
    metadatas: &[MovieMetadata],
  ) -> Result<usize, StoreError> {
    validate_batch(ids, embeddings, metadatas, self.dimension)?;
    let mut records = self.records.write().expect("store lock");

    let existing: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    if let Some(id) = ids.iter().find(|id| existing.contains(id.as_str())) {
      return Err(StoreError::IdCollision(id.clone()));
    }

    let first = records.len() as u64;
    for (i, ((id, embedding), metadata)) in ids.iter().zip(embeddings).zip(metadatas).enumerate() {
      records.push(MovieRecord {
        id: id.clone(),
        title: metadata.title.clone(),
        embedding: embedding.clone(),
        ordinal: first + i as u64,
      });
    }
    Ok(ids.len())
  }

  async fn get_by_metadata(
    &self,
    filter: &MetadataFilter,
    limit: usize,
  ) -> Result<Vec<MovieRecord>, StoreError> {
    filter.validate()?;
    let records = self.records.read().expect("store lock");
    Ok(records.iter().filter(|r| filter_matches(filter, r)).take(limit).cloned().collect())
  }

  async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
    validate_query_vector(vector, self.dimension)?;
    let records = self.records.read().expect("store lock");
    let mut neighbors: Vec<Neighbor> = records
      .iter()
      .map(|r| Neighbor { record: r.clone(), distance: squared_l2(vector, &r.embedding) })
      .collect();
    order_neighbors(&mut neighbors);
    neighbors.truncate(k);
    Ok(neighbors)
  }

  async fn count(&self) -> Result<usize, StoreError> {
    Ok(self.records.read().expect("store lock").len())
  }
}

/// Maps a few keywords onto fixed axes so tests can reason about distance
pub struct KeywordEncoder;

pub const KEYWORD_DIMENSION: usize = 3;

impl TextEncoder for KeywordEncoder {
  fn dimension(&self) -> usize {
    KEYWORD_DIMENSION
  }

  fn model_name(&self) -> &str {
    "keyword-test-encoder"
  }

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    let text = text.to_lowercase();
    let mut vector = vec![0.0; KEYWORD_DIMENSION];
    for (axis, keyword) in ["space", "heist", "romance"].iter().enumerate() {
      if text.contains(keyword) {
        vector[axis] = 1.0;
      }
    }
    Ok(vector)
  }
}

/// A small catalogue laid out along the keyword axes
pub fn catalogue() -> Vec<(&'static str, Vec<f32>)> {
  vec![
    ("Alien", vec![0.9, 0.0, 0.0]),
    ("Aliens", vec![0.8, 0.1, 0.0]),
    ("Heat", vec![0.0, 0.9, 0.1]),
    ("Ronin", vec![0.1, 0.8, 0.0]),
    ("Before Sunrise", vec![0.0, 0.0, 1.0]),
    ("Solaris", vec![0.7, 0.0, 0.3]),
  ]
}

pub async fn catalogue_recommender() -> Recommender {
  let store = InMemoryStore::with_movies(KEYWORD_DIMENSION, &catalogue()).await;
  Recommender::new(store, Arc::new(KeywordEncoder))
}
