//! Database connection management for LanceDB

use lancedb::{connect, Connection};
use std::error::Error;
use std::path::Path;

use crate::error::StoreError;

/// Create a LanceDB connection, creating the data directory if needed
pub async fn create_connection(data_dir: &Path) -> Result<Connection, StoreError> {
  ensure_data_directory_exists(data_dir)?;

  connect(&data_dir.to_string_lossy()).execute().await.map_err(|e| {
    StoreError::StorageUnavailable(format!(
      "failed to connect to LanceDB at {}: {e}",
      data_dir.display()
    ))
  })
}

/// Create data directory if it doesn't exist
fn ensure_data_directory_exists(data_dir: &Path) -> Result<(), StoreError> {
  if data_dir.is_file() {
    return Err(StoreError::StorageUnavailable(format!(
      "{} is a file, expected a directory",
      data_dir.display()
    )));
  }

  std::fs::create_dir_all(data_dir).map_err(|e| {
    StoreError::StorageUnavailable(format!(
      "failed to create data directory {}: {e}",
      data_dir.display()
    ))
  })
}

/// Map a failed LanceDB call, treating I/O anywhere in the cause chain as
/// storage that can no longer be reached
pub fn storage_failure<E: Error + 'static>(context: &str, error: E) -> StoreError {
  let io_cause = std::iter::successors(Some(&error as &(dyn Error + 'static)), |&e| e.source())
    .find_map(|e| e.downcast_ref::<std::io::Error>());

  match io_cause {
    Some(io) => StoreError::StorageUnavailable(format!("{context}: {io}")),
    None => StoreError::Backend(format!("{context}: {error}")),
  }
}
