//! Movie records, lookup filters, and recommendation results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;

/// Metadata fields that support exact-match filtering
pub const FILTERABLE_FIELDS: [&str; 2] = ["id", "title"];

/// One stored movie
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
  pub id: String,
  pub title: String,
  pub embedding: Vec<f32>,
  /// Insertion sequence number, assigned by the store
  pub ordinal: u64,
}

/// Metadata attached to a movie at ingestion time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieMetadata {
  pub title: String,
}

impl MovieMetadata {
  pub fn new(title: impl Into<String>) -> Self {
    Self { title: title.into() }
  }
}

/// A stored movie together with its distance from a query vector
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
  pub record: MovieRecord,
  pub distance: f32,
}

/// Exact-match filter over movie metadata; all entries are ANDed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
  fields: BTreeMap<String, String>,
}

impl MetadataFilter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Filter matching a single title
  pub fn title(title: impl Into<String>) -> Self {
    Self::new().with("title", title)
  }

  pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
    self.fields.insert(field.into(), value.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Reject fields the store cannot filter on
  pub fn validate(&self) -> Result<(), StoreError> {
    match self.fields.keys().find(|field| !FILTERABLE_FIELDS.contains(&field.as_str())) {
      Some(field) => Err(StoreError::InvalidArgument(format!(
        "cannot filter on '{field}', expected one of {FILTERABLE_FIELDS:?}"
      ))),
      None => Ok(()),
    }
  }
}

/// One recommended movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
  pub title: String,
  pub distance: f32,
}

/// Ordered recommendations, nearest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
  pub entries: Vec<Recommendation>,
}

impl Recommendations {
  pub fn into_titles(self) -> Vec<String> {
    self.entries.into_iter().map(|entry| entry.title).collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl FromIterator<Neighbor> for Recommendations {
  fn from_iter<I: IntoIterator<Item = Neighbor>>(iter: I) -> Self {
    let entries = iter
      .into_iter()
      .map(|neighbor| Recommendation { title: neighbor.record.title, distance: neighbor.distance })
      .collect();
    Self { entries }
  }
}
