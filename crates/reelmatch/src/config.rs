//! Configuration for reelmatch
//!
//! Settings live in `<root>/config.yaml`. The root is `$REELMATCH_ROOT` when
//! set, `~/.reelmatch` otherwise. A missing file means all defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ROOT_ENV_VAR: &str = "REELMATCH_ROOT";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SERVER_LOGS_FILE: &str = "server.logs.jsonl";

/// Top-level reelmatch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelmatchConfig {
  /// Directory holding the LanceDB dataset, relative paths resolve against the root
  pub storage_path: PathBuf,

  /// Table name inside the dataset
  pub collection: String,

  /// Embedding dimension used when the collection does not exist yet
  pub dimension: usize,

  pub default_top_n: usize,
  pub max_top_n: usize,

  /// Address the HTTP server binds to
  pub bind: SocketAddr,

  pub model: ModelConfig,

  #[serde(skip)]
  root: PathBuf,
}

/// Where the sentence-transformer comes from and how it tokenizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  /// Hugging Face repository id
  pub repo: String,
  pub model_file: String,
  pub tokenizer_file: String,
  pub max_sequence_length: usize,

  /// Override for the Hugging Face cache location
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cache_dir: Option<PathBuf>,

  /// Load model files from this directory instead of downloading them
  #[serde(skip_serializing_if = "Option::is_none")]
  pub local_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      repo: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
      model_file: "onnx/model.onnx".to_string(),
      tokenizer_file: "tokenizer.json".to_string(),
      max_sequence_length: 256,
      cache_dir: None,
      local_dir: None,
    }
  }
}

impl Default for ReelmatchConfig {
  fn default() -> Self {
    Self {
      storage_path: PathBuf::from("lancedb"),
      collection: "movies".to_string(),
      dimension: 384,
      default_top_n: 10,
      max_top_n: 100,
      bind: SocketAddr::from(([127, 0, 0, 1], 3100)),
      model: ModelConfig::default(),
      root: PathBuf::new(),
    }
  }
}

impl ReelmatchConfig {
  /// Load configuration from the resolved root directory
  pub fn load() -> Result<Self> {
    Self::load_from(&get_reelmatch_root()?)
  }

  /// Load configuration from `<root>/config.yaml`, falling back to defaults
  pub fn load_from(root: &Path) -> Result<Self> {
    let config_path = root.join(CONFIG_FILE);

    let mut config = if config_path.exists() {
      let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
      serde_yaml::from_str::<Self>(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?
    } else {
      bentley::verbose!("No config at {}, using defaults", config_path.display());
      Self::default()
    };

    config.root = root.to_path_buf();
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.collection.trim().is_empty() {
      return Err(anyhow!("collection name must not be empty"));
    }
    if self.dimension == 0 {
      return Err(anyhow!("dimension must be positive"));
    }
    if self.max_top_n == 0 {
      return Err(anyhow!("max_top_n must be positive"));
    }
    if self.default_top_n == 0 || self.default_top_n > self.max_top_n {
      return Err(anyhow!(
        "default_top_n must be between 1 and max_top_n ({}), got {}",
        self.max_top_n,
        self.default_top_n
      ));
    }
    if self.model.max_sequence_length == 0 {
      return Err(anyhow!("model.max_sequence_length must be positive"));
    }
    Ok(())
  }

  /// Storage directory with relative paths resolved against the root
  pub fn storage_dir(&self) -> PathBuf {
    if self.storage_path.is_absolute() {
      self.storage_path.clone()
    } else {
      self.root.join(&self.storage_path)
    }
  }

  pub fn server_logs_path(&self) -> PathBuf {
    self.root.join(SERVER_LOGS_FILE)
  }
}

/// Resolve the reelmatch root directory
pub fn get_reelmatch_root() -> Result<PathBuf> {
  if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
    if !root.trim().is_empty() {
      return Ok(PathBuf::from(root));
    }
  }

  let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
  Ok(home.join(".reelmatch"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn test_defaults_without_config_file() -> Result<()> {
    let temp = TempDir::new()?;
    let config = ReelmatchConfig::load_from(temp.path())?;

    assert_eq!(config.collection, "movies");
    assert_eq!(config.dimension, 384);
    assert_eq!(config.default_top_n, 10);
    assert_eq!(config.max_top_n, 100);
    assert_eq!(config.storage_dir(), temp.path().join("lancedb"));
    Ok(())
  }

  #[test]
  fn test_partial_config_file_keeps_other_defaults() -> Result<()> {
    let temp = TempDir::new()?;
    std::fs::write(
      temp.path().join(CONFIG_FILE),
      "collection: films\nmax_top_n: 20\nmodel:\n  max_sequence_length: 128\n",
    )?;

    let config = ReelmatchConfig::load_from(temp.path())?;

    assert_eq!(config.collection, "films");
    assert_eq!(config.max_top_n, 20);
    assert_eq!(config.model.max_sequence_length, 128);
    assert_eq!(config.model.repo, "sentence-transformers/all-MiniLM-L6-v2");
    Ok(())
  }

  #[test]
  fn test_absolute_storage_path_is_kept() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = temp.path().join("elsewhere");
    std::fs::write(temp.path().join(CONFIG_FILE), format!("storage_path: {}\n", storage.display()))?;

    let config = ReelmatchConfig::load_from(temp.path())?;
    assert_eq!(config.storage_dir(), storage);
    Ok(())
  }

  #[test]
  fn test_invalid_top_n_settings_are_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    std::fs::write(temp.path().join(CONFIG_FILE), "default_top_n: 50\nmax_top_n: 10\n")?;

    assert!(ReelmatchConfig::load_from(temp.path()).is_err());
    Ok(())
  }

  #[test]
  #[serial]
  fn test_root_from_environment() -> Result<()> {
    std::env::set_var(ROOT_ENV_VAR, "/tmp/reelmatch-root");
    let root = get_reelmatch_root();
    std::env::remove_var(ROOT_ENV_VAR);

    assert_eq!(root?, PathBuf::from("/tmp/reelmatch-root"));
    Ok(())
  }
}
