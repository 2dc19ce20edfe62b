use anyhow::{anyhow, Result};
use bentley::daemon_logs::DaemonLogs;
use colored::*;
use std::path::Path;

use crate::cli::display::{display_log_entry, display_recommendations};
use crate::config::ReelmatchConfig;
use crate::error::RecommendError;
use crate::server::services::context::{open_store, AppContext};
use crate::server::services::ingest::ingest_files;

/// Load precomputed embeddings and titles into the collection
pub async fn ingest(
  config: &ReelmatchConfig,
  embeddings: &Path,
  titles: &Path,
  title_column: &str,
) -> Result<()> {
  let store = open_store(config).await.map_err(user_error)?;

  bentley::info!("Loading {} and {}", embeddings.display(), titles.display());
  let report = ingest_files(store.as_ref(), embeddings, titles, title_column).await?;

  println!(
    "{} Ingested {} movies into '{}' ({} total)",
    "✓".green(),
    report.inserted.to_string().bold(),
    config.collection.cyan(),
    report.total
  );
  Ok(())
}

/// Recommend movies similar to a stored title
pub async fn recommend_by_title(config: &ReelmatchConfig, title: &str, top_n: Option<usize>) -> Result<()> {
  let context = AppContext::initialize(config).await.map_err(user_error)?;
  let top_n = top_n.unwrap_or(config.default_top_n);

  let recommendations =
    context.recommender().recommend_by_title(title, top_n).await.map_err(user_error)?;

  display_recommendations(&format!("'{title}'"), &recommendations);
  Ok(())
}

/// Recommend movies matching a free-text description
pub async fn recommend_by_description(
  config: &ReelmatchConfig,
  description: &str,
  top_n: Option<usize>,
) -> Result<()> {
  let context = AppContext::initialize(config).await.map_err(user_error)?;
  let top_n = top_n.unwrap_or(config.default_top_n);

  let recommendations = context
    .recommender()
    .recommend_by_description(description, top_n)
    .await
    .map_err(user_error)?;

  display_recommendations(&format!("\"{description}\""), &recommendations);
  Ok(())
}

/// Show how many movies are stored
pub async fn count(config: &ReelmatchConfig) -> Result<()> {
  let store = open_store(config).await.map_err(user_error)?;
  let movies = store.count().await?;

  println!(
    "{} movies in '{}' ({} dimensions)",
    movies.to_string().bold(),
    config.collection.cyan(),
    store.dimension()
  );
  Ok(())
}

/// Read the server's log file
pub async fn logs(config: &ReelmatchConfig, limit: usize, level: &str) -> Result<()> {
  let path = config.server_logs_path();
  if !path.exists() {
    println!("No logs found.");
    return Ok(());
  }

  let daemon_logs = DaemonLogs::new_with_silent(&path, true)?;
  let entries = daemon_logs.get_logs(Some(limit), Some(level)).await?;

  if entries.is_empty() {
    println!("No logs found.");
    return Ok(());
  }

  for entry in &entries {
    display_log_entry(entry);
  }
  Ok(())
}

fn user_error(error: RecommendError) -> anyhow::Error {
  anyhow!(error.user_message())
}
