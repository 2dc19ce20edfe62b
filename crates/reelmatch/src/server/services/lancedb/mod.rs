//! LanceDB-backed movie store
//!
//! Movies live in a single LanceDB table whose embedding column is a
//! fixed-size list, so the dimension is part of the on-disk schema.

pub mod connection;
pub mod models;
pub mod records;
pub mod search;
pub mod table_manager;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::server::models::movie::{MetadataFilter, MovieMetadata, MovieRecord, Neighbor};
use crate::server::services::vector_store::{
  order_neighbors, tied_past_cutoff, validate_batch, validate_query_vector, VectorStore,
};
use connection::create_connection;
use models::MovieRow;
use table_manager::{sql_string_literal, TableManager};

/// Extra rows fetched beyond `k` on the first nearest-neighbor pass
const TIE_MARGIN: usize = 8;

/// LanceDB implementation of the VectorStore trait
pub struct LanceDbMovieStore {
  table_manager: TableManager,
  data_dir: PathBuf,
  // Serializes writers so ordinals stay contiguous; readers never take it
  write_lock: Mutex<()>,
}

impl LanceDbMovieStore {
  /// Open the collection at `data_dir`, creating it if needed
  ///
  /// Reopening an existing directory never resets its contents.
  pub async fn open(
    data_dir: &Path,
    collection: &str,
    dimension: usize,
  ) -> Result<Self, StoreError> {
    let connection = create_connection(data_dir).await?;
    let table_manager = TableManager::open_or_create(&connection, collection, dimension).await?;

    bentley::verbose!(
      "Opened collection '{}' at {} ({} dimensions)",
      collection,
      data_dir.display(),
      table_manager.dimension()
    );

    Ok(Self { table_manager, data_dir: data_dir.to_path_buf(), write_lock: Mutex::new(()) })
  }

  /// Backend failures after the data directory vanished mean the store is gone
  fn unreachable_or(&self, error: StoreError) -> StoreError {
    match error {
      StoreError::Backend(reason) if !self.data_dir.is_dir() => StoreError::StorageUnavailable(format!(
        "{} is no longer reachable: {reason}",
        self.data_dir.display()
      )),
      other => other,
    }
  }

  async fn count_rows(&self, filter: Option<String>) -> Result<usize, StoreError> {
    self.table_manager.count_rows(filter).await.map_err(|e| self.unreachable_or(e))
  }
}

#[async_trait]
impl VectorStore for LanceDbMovieStore {
  fn dimension(&self) -> usize {
    self.table_manager.dimension()
  }

  async fn bulk_insert(
    &self,
    ids: &[String],
    embeddings: &[Vec<f32>],
    metadatas: &[MovieMetadata],
  ) -> Result<usize, StoreError> {
    validate_batch(ids, embeddings, metadatas, self.dimension())?;
    if ids.is_empty() {
      return Ok(0);
    }

    let _guard = self.write_lock.lock().await;

    let existing = self.count_rows(None).await?;
    if existing > 0 {
      if let Some(id) = self.table_manager.find_existing_id(ids).await.map_err(|e| self.unreachable_or(e))? {
        return Err(StoreError::IdCollision(id));
      }
    }

    let first_ordinal = existing as u64;
    let rows: Vec<MovieRow> = ids
      .iter()
      .zip(embeddings)
      .zip(metadatas)
      .enumerate()
      .map(|(i, ((id, embedding), metadata))| {
        MovieRow::new(id.clone(), metadata.title.clone(), first_ordinal + i as u64, embedding.clone())
      })
      .collect();

    self.table_manager.add_rows(&rows).await.map_err(|e| self.unreachable_or(e))?;
    Ok(rows.len())
  }

  async fn get_by_metadata(
    &self,
    filter: &MetadataFilter,
    limit: usize,
  ) -> Result<Vec<MovieRecord>, StoreError> {
    filter.validate()?;
    if limit == 0 {
      return Ok(Vec::new());
    }

    let sql = filter_to_sql(filter);
    let matching = self.count_rows(sql.clone()).await?;
    if matching == 0 {
      return Ok(Vec::new());
    }

    // Fetch every match so the lowest ordinal wins regardless of scan order
    let mut records = search::query_by_filter(self.table_manager.table(), sql.as_deref(), matching)
      .await
      .map_err(|e| self.unreachable_or(e))?;
    records.sort_by_key(|record| record.ordinal);
    records.truncate(limit);
    Ok(records)
  }

  async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
    validate_query_vector(vector, self.dimension())?;
    let total = self.count_rows(None).await?;
    if k == 0 || total == 0 {
      return Ok(Vec::new());
    }

    // Widen until every row tied with the k-th neighbor is in hand, so the
    // lowest ordinals win no matter which tied rows LanceDB kept
    let mut limit = k.saturating_add(TIE_MARGIN).min(total);
    loop {
      let mut neighbors = search::nearest_neighbors(self.table_manager.table(), vector, limit)
        .await
        .map_err(|e| self.unreachable_or(e))?;
      order_neighbors(&mut neighbors);

      if limit >= total || !tied_past_cutoff(&neighbors, k) {
        neighbors.truncate(k);
        return Ok(neighbors);
      }
      bentley::verbose!("Ties at neighbor {k} fill all {limit} fetched rows, widening");
      limit = limit.saturating_mul(2).min(total);
    }
  }

  async fn count(&self) -> Result<usize, StoreError> {
    self.count_rows(None).await
  }
}

/// Render a metadata filter as a LanceDB SQL predicate
fn filter_to_sql(filter: &MetadataFilter) -> Option<String> {
  if filter.is_empty() {
    return None;
  }

  let clauses: Vec<String> = filter
    .fields()
    .map(|(field, value)| format!("{field} = {}", sql_string_literal(value)))
    .collect();
  Some(clauses.join(" AND "))
}
