//! Bulk loader for precomputed movie embeddings
//!
//! Reads a 2-D NumPy matrix (one row per movie) and a CSV title table, checks
//! that they line up, then writes everything with a single `bulk_insert`.

use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use ndarray::Array2;
use ndarray_npy::read_npy;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::error::IngestError;
use crate::server::models::movie::MovieMetadata;
use crate::server::services::vector_store::VectorStore;

pub const DEFAULT_TITLE_COLUMN: &str = "title";

/// Embeddings and titles paired by row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub embeddings: Vec<Vec<f32>>,
  pub titles: Vec<String>,
}

/// Outcome of a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
  pub inserted: usize,
  /// Store size after the insert
  pub total: usize,
}

impl Dataset {
  /// Read both files and check that their row counts agree
  pub fn load(embeddings_path: &Path, titles_path: &Path, title_column: &str) -> Result<Self, IngestError> {
    let embeddings = read_embeddings(embeddings_path)?;
    let titles = read_titles(titles_path, title_column)?;
    let dataset = Self { embeddings, titles };
    dataset.check()?;
    Ok(dataset)
  }

  fn check(&self) -> Result<(), IngestError> {
    if self.embeddings.len() != self.titles.len() {
      return Err(IngestError::RowCountMismatch {
        embeddings: self.embeddings.len(),
        titles: self.titles.len(),
      });
    }
    if self.embeddings.is_empty() {
      return Err(IngestError::Empty("dataset has no rows".into()));
    }
    Ok(())
  }

  /// Row indices as decimal strings
  pub fn ids(&self) -> Vec<String> {
    (0..self.titles.len()).map(|i| i.to_string()).collect()
  }
}

/// Insert a dataset into the store in one write
pub async fn ingest(store: &dyn VectorStore, dataset: &Dataset) -> Result<IngestReport, IngestError> {
  dataset.check()?;

  let ids = dataset.ids();
  let metadatas: Vec<MovieMetadata> = dataset.titles.iter().map(MovieMetadata::new).collect();

  bentley::verbose!("Inserting {} movies", ids.len());
  let inserted = store.bulk_insert(&ids, &dataset.embeddings, &metadatas).await?;
  let total = store.count().await?;

  Ok(IngestReport { inserted, total })
}

/// Read both files and ingest them
pub async fn ingest_files(
  store: &dyn VectorStore,
  embeddings_path: &Path,
  titles_path: &Path,
  title_column: &str,
) -> Result<IngestReport, IngestError> {
  let dataset = Dataset::load(embeddings_path, titles_path, title_column)?;
  ingest(store, &dataset).await
}

/// Load a 2-D `.npy` matrix of `f32` or `f64` values
pub fn read_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, IngestError> {
  let matrix: Array2<f32> = match read_npy::<_, Array2<f32>>(path) {
    Ok(matrix) => matrix,
    Err(f32_error) => match read_npy::<_, Array2<f64>>(path) {
      Ok(matrix) => matrix.mapv(|value| value as f32),
      Err(_) => return Err(read_error(path, f32_error)),
    },
  };

  Ok(matrix.rows().into_iter().map(|row| row.to_vec()).collect())
}

/// Load one column of a headed CSV file as strings
pub fn read_titles(path: &Path, title_column: &str) -> Result<Vec<String>, IngestError> {
  let file = File::open(path).map_err(|e| read_error(path, e))?;
  let (inferred, _) = Format::default()
    .with_header(true)
    .infer_schema(file, Some(0))
    .map_err(|e| read_error(path, e))?;

  // Read every column as text so titles like "1917" stay strings
  let schema = Schema::new(
    inferred
      .fields()
      .iter()
      .map(|field| Field::new(field.name(), DataType::Utf8, true))
      .collect::<Vec<_>>(),
  );
  if schema.index_of(title_column).is_err() {
    return Err(IngestError::Read {
      path: path.display().to_string(),
      reason: format!("no '{title_column}' column"),
    });
  }

  let file = File::open(path).map_err(|e| read_error(path, e))?;
  let reader = ReaderBuilder::new(Arc::new(schema))
    .with_header(true)
    .build(file)
    .map_err(|e| read_error(path, e))?;

  let mut titles = Vec::new();
  for batch in reader {
    let batch = batch.map_err(|e| read_error(path, e))?;
    let column = batch
      .column_by_name(title_column)
      .and_then(|column| column.as_any().downcast_ref::<StringArray>())
      .ok_or_else(|| read_error(path, format!("'{title_column}' is not a text column")))?;

    for i in 0..column.len() {
      if column.is_null(i) {
        return Err(read_error(path, format!("row {} has no title", titles.len())));
      }
      titles.push(column.value(i).to_string());
    }
  }

  Ok(titles)
}

fn read_error(path: &Path, reason: impl std::fmt::Display) -> IngestError {
  IngestError::Read { path: path.display().to_string(), reason: reason.to_string() }
}
