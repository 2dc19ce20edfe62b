//! Arrow RecordBatch conversion utilities for LanceDB

use arrow::array::builder::Float32Builder;
use arrow::array::{
  Array, ArrayRef, FixedSizeListArray, FixedSizeListBuilder, Float32Array, StringArray,
  UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use super::models::{MovieRow, EMBEDDING_COLUMN, ID_COLUMN, ORDINAL_COLUMN, TITLE_COLUMN};
use crate::error::StoreError;

/// Arrow schema for the movie table at the given embedding dimension
pub fn movie_schema(dimension: usize) -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new(ID_COLUMN, DataType::Utf8, false),
    Field::new(TITLE_COLUMN, DataType::Utf8, false),
    Field::new(ORDINAL_COLUMN, DataType::UInt64, false),
    Field::new(
      EMBEDDING_COLUMN,
      DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dimension as i32),
      false,
    ),
  ]))
}

/// Read the embedding dimension back out of a stored schema
pub fn dimension_from_schema(schema: &Schema) -> Result<usize, StoreError> {
  let field = schema.field_with_name(EMBEDDING_COLUMN).map_err(|_| {
    StoreError::StorageUnavailable(format!("collection has no '{EMBEDDING_COLUMN}' column"))
  })?;

  match field.data_type() {
    DataType::FixedSizeList(_, size) if *size > 0 => Ok(*size as usize),
    other => Err(StoreError::StorageUnavailable(format!(
      "'{EMBEDDING_COLUMN}' column has unexpected type {other}"
    ))),
  }
}

/// Convert movie rows to an Arrow RecordBatch
pub fn rows_to_arrow_batch(rows: &[MovieRow], dimension: usize) -> Result<RecordBatch, StoreError> {
  if rows.is_empty() {
    return Err(StoreError::InvalidArgument("cannot build a batch from zero rows".into()));
  }

  let columns: Vec<ArrayRef> = vec![
    Arc::new(StringArray::from_iter_values(rows.iter().map(|row| row.id.as_str()))),
    Arc::new(StringArray::from_iter_values(rows.iter().map(|row| row.title.as_str()))),
    Arc::new(UInt64Array::from_iter_values(rows.iter().map(|row| row.ordinal))),
    Arc::new(embedding_array(rows, dimension)),
  ];

  RecordBatch::try_new(movie_schema(dimension), columns)
    .map_err(|e| StoreError::Backend(format!("failed to create RecordBatch: {e}")))
}

/// Create the fixed-size list column holding every row's embedding
fn embedding_array(rows: &[MovieRow], dimension: usize) -> FixedSizeListArray {
  let mut builder =
    FixedSizeListBuilder::new(Float32Builder::with_capacity(dimension * rows.len()), dimension as i32);

  for row in rows {
    builder.values().append_slice(&row.embedding);
    builder.append(true);
  }

  builder.finish()
}

/// Copy one embedding out of a fixed-size list column
pub fn embedding_at(list: &FixedSizeListArray, row_index: usize) -> Result<Vec<f32>, StoreError> {
  let values = list.value(row_index);
  let floats = values
    .as_any()
    .downcast_ref::<Float32Array>()
    .ok_or_else(|| StoreError::Backend(format!("'{EMBEDDING_COLUMN}' items are not f32")))?;
  Ok(floats.values().to_vec())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(id: &str, title: &str, ordinal: u64, embedding: Vec<f32>) -> MovieRow {
    MovieRow::new(id.to_string(), title.to_string(), ordinal, embedding)
  }

  #[test]
  fn test_rows_to_arrow_batch_layout() -> Result<(), StoreError> {
    let rows = vec![row("0", "Alien", 0, vec![0.1, 0.2, 0.3]), row("1", "Aliens", 1, vec![0.4, 0.5, 0.6])];

    let batch = rows_to_arrow_batch(&rows, 3)?;

    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.num_columns(), 4);
    assert_eq!(dimension_from_schema(&batch.schema())?, 3);

    let list = batch
      .column_by_name(EMBEDDING_COLUMN)
      .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>())
      .expect("embedding column");
    assert_eq!(embedding_at(list, 1)?, vec![0.4, 0.5, 0.6]);
    Ok(())
  }

  #[test]
  fn test_rows_to_arrow_batch_rejects_empty_input() {
    assert!(matches!(rows_to_arrow_batch(&[], 3), Err(StoreError::InvalidArgument(_))));
  }

  #[test]
  fn test_dimension_from_schema_requires_embedding_column() {
    let schema = Schema::new(vec![Field::new(ID_COLUMN, DataType::Utf8, false)]);
    assert!(matches!(dimension_from_schema(&schema), Err(StoreError::StorageUnavailable(_))));
  }
}
