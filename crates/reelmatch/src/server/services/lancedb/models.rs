//! Row layout for the LanceDB movie table

pub const ID_COLUMN: &str = "id";
pub const TITLE_COLUMN: &str = "title";
pub const ORDINAL_COLUMN: &str = "ordinal";
pub const EMBEDDING_COLUMN: &str = "embedding";
pub const DISTANCE_COLUMN: &str = "_distance";

/// Record structure for storing in LanceDB
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
  pub id: String,
  pub title: String,
  pub ordinal: u64,
  pub embedding: Vec<f32>,
}

impl MovieRow {
  pub fn new(id: String, title: String, ordinal: u64, embedding: Vec<f32>) -> Self {
    Self { id, title, ordinal, embedding }
  }
}
