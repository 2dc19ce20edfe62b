//! Filter lookups, vector search, and result decoding for LanceDB

use arrow::array::{Array, FixedSizeListArray, Float32Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use super::connection::storage_failure;
use super::models::{DISTANCE_COLUMN, EMBEDDING_COLUMN, ID_COLUMN, ORDINAL_COLUMN, TITLE_COLUMN};
use super::records::embedding_at;
use crate::error::StoreError;
use crate::server::models::movie::{MovieRecord, Neighbor};

/// Fetch every row matching a SQL filter (at most `limit`)
pub async fn query_by_filter(
  table: &Table,
  filter: Option<&str>,
  limit: usize,
) -> Result<Vec<MovieRecord>, StoreError> {
  let mut query = table.query().limit(limit);
  if let Some(filter) = filter {
    query = query.only_if(filter);
  }

  let stream = query
    .execute()
    .await
    .map_err(|e| storage_failure("metadata query failed", e))?;
  let batches: Vec<RecordBatch> = stream
    .try_collect()
    .await
    .map_err(|e| storage_failure("error reading batch", e))?;

  let mut records = Vec::new();
  for batch in &batches {
    records.extend(batch_to_records(batch)?);
  }
  Ok(records)
}

/// Exact nearest-neighbor search under L2 distance
///
/// Returns the `limit` closest rows in whatever order LanceDB emits them.
/// Which of several equally distant rows make the cut is up to LanceDB;
/// callers sort and widen as needed.
pub async fn nearest_neighbors(
  table: &Table,
  vector: &[f32],
  limit: usize,
) -> Result<Vec<Neighbor>, StoreError> {
  let query = table
    .vector_search(vector)
    .map_err(|e| StoreError::InvalidArgument(format!("invalid query vector: {e}")))?
    .column(EMBEDDING_COLUMN)
    .distance_type(DistanceType::L2)
    .bypass_vector_index()
    .limit(limit);

  let stream =
    query.execute().await.map_err(|e| storage_failure("vector search failed", e))?;
  let batches: Vec<RecordBatch> = stream
    .try_collect()
    .await
    .map_err(|e| storage_failure("error reading batch", e))?;

  let mut neighbors = Vec::new();
  for batch in &batches {
    neighbors.extend(batch_to_neighbors(batch)?);
  }
  Ok(neighbors)
}

/// Column arrays extracted from a result batch
struct BatchColumns<'a> {
  id: &'a StringArray,
  title: &'a StringArray,
  ordinal: &'a UInt64Array,
  embedding: &'a FixedSizeListArray,
}

impl<'a> BatchColumns<'a> {
  fn extract(batch: &'a RecordBatch) -> Result<Self, StoreError> {
    Ok(Self {
      id: typed_column(batch, ID_COLUMN)?,
      title: typed_column(batch, TITLE_COLUMN)?,
      ordinal: typed_column(batch, ORDINAL_COLUMN)?,
      embedding: typed_column(batch, EMBEDDING_COLUMN)?,
    })
  }

  fn record(&self, row_index: usize) -> Result<MovieRecord, StoreError> {
    Ok(MovieRecord {
      id: self.id.value(row_index).to_string(),
      title: self.title.value(row_index).to_string(),
      ordinal: self.ordinal.value(row_index),
      embedding: embedding_at(self.embedding, row_index)?,
    })
  }
}

fn typed_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, StoreError> {
  batch
    .column_by_name(name)
    .ok_or_else(|| StoreError::Backend(format!("missing '{name}' column")))?
    .as_any()
    .downcast_ref::<T>()
    .ok_or_else(|| StoreError::Backend(format!("'{name}' column has an unexpected type")))
}

fn batch_to_records(batch: &RecordBatch) -> Result<Vec<MovieRecord>, StoreError> {
  let columns = BatchColumns::extract(batch)?;
  (0..batch.num_rows()).map(|i| columns.record(i)).collect()
}

fn batch_to_neighbors(batch: &RecordBatch) -> Result<Vec<Neighbor>, StoreError> {
  let columns = BatchColumns::extract(batch)?;
  let distances: &Float32Array = typed_column(batch, DISTANCE_COLUMN)?;

  (0..batch.num_rows())
    .map(|i| {
      if distances.is_null(i) {
        return Err(StoreError::Backend(format!("row {i} has no distance")));
      }
      Ok(Neighbor { record: columns.record(i)?, distance: distances.value(i) })
    })
    .collect()
}
