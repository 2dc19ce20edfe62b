//! Vector store abstraction for movie embeddings
//!
//! The retrieval service only talks to this trait, so the LanceDB backend can
//! be swapped for another engine (or a test double) without touching
//! recommendation logic.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;
use crate::server::models::movie::{MetadataFilter, MovieMetadata, MovieRecord, Neighbor};

/// Persistent collection of movie embeddings with metadata lookup and
/// nearest-neighbor search
///
/// Implementations must allow concurrent reads without external locking.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Fixed embedding dimension of the collection
  fn dimension(&self) -> usize;

  /// Insert a batch of movies in one durable write
  ///
  /// The three slices are zipped by position. Nothing is written unless the
  /// whole batch is valid. Returns the number of inserted records.
  async fn bulk_insert(
    &self,
    ids: &[String],
    embeddings: &[Vec<f32>],
    metadatas: &[MovieMetadata],
  ) -> Result<usize, StoreError>;

  /// Exact-match lookup, lowest ordinal first, at most `limit` records
  async fn get_by_metadata(
    &self,
    filter: &MetadataFilter,
    limit: usize,
  ) -> Result<Vec<MovieRecord>, StoreError>;

  /// Up to `k` nearest records, ascending distance, ties by ordinal
  async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError>;

  /// Number of stored records
  async fn count(&self) -> Result<usize, StoreError>;
}

/// Shared handle to any store implementation
pub type SharedVectorStore = Arc<dyn VectorStore>;

/// Check a batch before anything is written
pub fn validate_batch(
  ids: &[String],
  embeddings: &[Vec<f32>],
  metadatas: &[MovieMetadata],
  dimension: usize,
) -> Result<(), StoreError> {
  if ids.len() != embeddings.len() || ids.len() != metadatas.len() {
    return Err(StoreError::InvalidArgument(format!(
      "batch lengths differ: {} ids, {} embeddings, {} metadatas",
      ids.len(),
      embeddings.len(),
      metadatas.len()
    )));
  }

  if let Some(embedding) = embeddings.iter().find(|embedding| embedding.len() != dimension) {
    return Err(StoreError::DimensionMismatch { expected: dimension, actual: embedding.len() });
  }

  let mut seen = HashSet::with_capacity(ids.len());
  match ids.iter().find(|id| !seen.insert(id.as_str())) {
    Some(duplicate) => Err(StoreError::IdCollision(duplicate.clone())),
    None => Ok(()),
  }
}

/// Check a query vector against the collection dimension
pub fn validate_query_vector(vector: &[f32], dimension: usize) -> Result<(), StoreError> {
  if vector.len() != dimension {
    return Err(StoreError::DimensionMismatch { expected: dimension, actual: vector.len() });
  }
  if vector.iter().any(|value| !value.is_finite()) {
    return Err(StoreError::InvalidArgument("query vector contains non-finite values".into()));
  }
  Ok(())
}

/// Sort neighbors by ascending distance, breaking ties by insertion order
pub fn order_neighbors(neighbors: &mut [Neighbor]) {
  neighbors.sort_by(|a, b| {
    a.distance.total_cmp(&b.distance).then_with(|| a.record.ordinal.cmp(&b.record.ordinal))
  });
}

/// Whether rows tied with the `k`-th neighbor run to the end of an ordered,
/// possibly truncated result, so unseen rows might share that distance
pub fn tied_past_cutoff(ordered: &[Neighbor], k: usize) -> bool {
  match (k.checked_sub(1).and_then(|i| ordered.get(i)), ordered.last()) {
    (Some(kth), Some(last)) => last.distance <= kth.distance,
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn neighbor(title: &str, ordinal: u64, distance: f32) -> Neighbor {
    Neighbor {
      record: MovieRecord {
        id: ordinal.to_string(),
        title: title.to_string(),
        embedding: Vec::new(),
        ordinal,
      },
      distance,
    }
  }

  fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn test_validate_batch_accepts_consistent_batch() {
    let result = validate_batch(
      &ids(&["0", "1"]),
      &[vec![0.0, 1.0], vec![1.0, 0.0]],
      &[MovieMetadata::new("A"), MovieMetadata::new("B")],
      2,
    );
    assert!(result.is_ok());
  }

  #[test]
  fn test_validate_batch_rejects_length_mismatch() {
    let result = validate_batch(&ids(&["0", "1"]), &[vec![0.0, 1.0]], &[MovieMetadata::new("A")], 2);
    assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
  }

  #[test]
  fn test_validate_batch_rejects_wrong_dimension() {
    let result = validate_batch(
      &ids(&["0", "1"]),
      &[vec![0.0, 1.0], vec![1.0, 0.0, 0.5]],
      &[MovieMetadata::new("A"), MovieMetadata::new("B")],
      2,
    );
    assert!(matches!(result, Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })));
  }

  #[test]
  fn test_validate_batch_rejects_duplicate_ids_within_batch() {
    let result = validate_batch(
      &ids(&["7", "7"]),
      &[vec![0.0], vec![1.0]],
      &[MovieMetadata::new("A"), MovieMetadata::new("B")],
      1,
    );
    assert!(matches!(result, Err(StoreError::IdCollision(id)) if id == "7"));
  }

  #[test]
  fn test_validate_query_vector() {
    assert!(validate_query_vector(&[0.0, 1.0], 2).is_ok());
    assert!(matches!(
      validate_query_vector(&[0.0], 2),
      Err(StoreError::DimensionMismatch { expected: 2, actual: 1 })
    ));
    assert!(matches!(
      validate_query_vector(&[f32::NAN, 0.0], 2),
      Err(StoreError::InvalidArgument(_))
    ));
  }

  #[test]
  fn test_order_neighbors_breaks_ties_by_ordinal() {
    let mut neighbors =
      vec![neighbor("C", 2, 0.5), neighbor("B", 1, 0.5), neighbor("A", 0, 0.9), neighbor("D", 3, 0.1)];
    order_neighbors(&mut neighbors);
    let titles: Vec<_> = neighbors.iter().map(|n| n.record.title.as_str()).collect();
    assert_eq!(titles, vec!["D", "B", "C", "A"]);
  }

  #[test]
  fn test_tied_past_cutoff() {
    let spread = vec![neighbor("A", 0, 0.1), neighbor("B", 1, 0.2), neighbor("C", 2, 0.3)];
    assert!(!tied_past_cutoff(&spread, 2));

    let tied_tail = vec![neighbor("A", 0, 0.1), neighbor("B", 1, 0.2), neighbor("C", 2, 0.2)];
    assert!(tied_past_cutoff(&tied_tail, 2));
    assert!(tied_past_cutoff(&tied_tail, 3));

    assert!(!tied_past_cutoff(&spread, 0));
    assert!(!tied_past_cutoff(&spread[..1], 2));
  }
}
