//! Table management operations for LanceDB

use arrow::record_batch::RecordBatchIterator;
use lancedb::{Connection, Table};

use super::connection::storage_failure;
use super::models::{MovieRow, ID_COLUMN};
use super::records::{dimension_from_schema, movie_schema, rows_to_arrow_batch};
use crate::error::StoreError;

/// Ids per `IN (...)` clause when probing for collisions
const ID_PROBE_CHUNK: usize = 512;

/// Owns the opened movie table and its fixed dimension
pub struct TableManager {
  table: Table,
  table_name: String,
  dimension: usize,
}

impl TableManager {
  /// Open the named table, creating it empty if it does not exist yet
  ///
  /// An existing table keeps the dimension recorded in its schema.
  pub async fn open_or_create(
    connection: &Connection,
    table_name: &str,
    default_dimension: usize,
  ) -> Result<Self, StoreError> {
    let table = if table_exists(connection, table_name).await? {
      open_table(connection, table_name).await?
    } else {
      create_empty_table(connection, table_name, default_dimension).await?
    };

    let schema = table
      .schema()
      .await
      .map_err(|e| StoreError::StorageUnavailable(format!("failed to read table schema: {e}")))?;
    let dimension = dimension_from_schema(&schema)?;

    if dimension != default_dimension {
      bentley::warn!(
        "Collection '{table_name}' stores {dimension}-dimensional embeddings (configured {default_dimension}); using {dimension}"
      );
    }

    Ok(Self { table, table_name: table_name.to_string(), dimension })
  }

  pub fn table(&self) -> &Table {
    &self.table
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  /// Count rows, optionally restricted by a SQL filter
  pub async fn count_rows(&self, filter: Option<String>) -> Result<usize, StoreError> {
    self
      .table
      .count_rows(filter)
      .await
      .map_err(|e| storage_failure("failed to count rows", e))
  }

  /// Return the first of `ids` that already exists in the table
  pub async fn find_existing_id(&self, ids: &[String]) -> Result<Option<String>, StoreError> {
    for chunk in ids.chunks(ID_PROBE_CHUNK) {
      let filter = format!("{ID_COLUMN} IN ({})", quoted_list(chunk));
      if self.count_rows(Some(filter)).await? == 0 {
        continue;
      }

      // Narrow down which id collided for the error message
      for id in chunk {
        let filter = format!("{ID_COLUMN} = {}", sql_string_literal(id));
        if self.count_rows(Some(filter)).await? > 0 {
          return Ok(Some(id.clone()));
        }
      }
    }
    Ok(None)
  }

  /// Append rows in a single commit
  pub async fn add_rows(&self, rows: &[MovieRow]) -> Result<(), StoreError> {
    let batch = rows_to_arrow_batch(rows, self.dimension)?;
    let schema = batch.schema();
    let batch_iter = RecordBatchIterator::new(vec![Ok(batch)], schema);

    self
      .table
      .add(batch_iter)
      .execute()
      .await
      .map_err(|e| storage_failure("failed to store embeddings", e))?;

    bentley::verbose!("Stored {} embeddings in '{}'", rows.len(), self.table_name);
    Ok(())
  }
}

/// Check if the target table exists
async fn table_exists(connection: &Connection, table_name: &str) -> Result<bool, StoreError> {
  let tables = connection
    .table_names()
    .execute()
    .await
    .map_err(|e| StoreError::StorageUnavailable(format!("failed to list tables: {e}")))?;
  Ok(tables.iter().any(|name| name == table_name))
}

async fn open_table(connection: &Connection, table_name: &str) -> Result<Table, StoreError> {
  connection.open_table(table_name).execute().await.map_err(|e| {
    StoreError::StorageUnavailable(format!("failed to open table '{table_name}': {e}"))
  })
}

async fn create_empty_table(
  connection: &Connection,
  table_name: &str,
  dimension: usize,
) -> Result<Table, StoreError> {
  if dimension == 0 {
    return Err(StoreError::InvalidArgument("embedding dimension must be positive".into()));
  }

  let table = connection
    .create_empty_table(table_name, movie_schema(dimension))
    .execute()
    .await
    .map_err(|e| {
      StoreError::StorageUnavailable(format!("failed to create table '{table_name}': {e}"))
    })?;

  bentley::info!("Created collection '{table_name}' with {dimension}-dimensional embeddings");
  Ok(table)
}

/// Quote a value for use inside a LanceDB SQL filter
pub fn sql_string_literal(value: &str) -> String {
  format!("'{}'", value.replace('\'', "''"))
}

fn quoted_list(values: &[String]) -> String {
  values.iter().map(|value| sql_string_literal(value)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sql_string_literal_escapes_quotes() {
    assert_eq!(sql_string_literal("Heat"), "'Heat'");
    assert_eq!(sql_string_literal("Schindler's List"), "'Schindler''s List'");
  }

  #[test]
  fn test_quoted_list() {
    let ids = vec!["1".to_string(), "o'2".to_string()];
    assert_eq!(quoted_list(&ids), "'1', 'o''2'");
  }
}
