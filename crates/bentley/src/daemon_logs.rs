//! Daemon logging infrastructure for bentley
//!
//! Persistent, structured logging for long-running servers:
//! - JSONL disk storage, one entry per line
//! - Thread-safe async operations with internal locking
//! - Optional console echo through the regular bentley macros

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "schemars")]
use schemars::JsonSchema;

// Types and Data Structures
// =========================

/// Request context information for logs
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogContext {
  /// Request ID for correlation
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,

  /// HTTP method
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,

  /// Request path
  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,

  /// Request duration in milliseconds
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,

  /// HTTP status code
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
}

/// A structured log entry for daemon operations
#[derive(Debug, Serialize, Deserialize, Clone)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
  pub component: String,

  /// Optional request context
  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

struct DaemonLogsInner {
  log_file_path: PathBuf,
  silent: bool,
}

/// Thread-safe disk-based log storage for daemons using JSONL format
#[derive(Clone)]
pub struct DaemonLogs {
  inner: Arc<tokio::sync::Mutex<DaemonLogsInner>>,
}

impl DaemonLogsInner {
  fn new(log_file_path: &Path, silent: bool) -> std::io::Result<Self> {
    if let Some(parent) = log_file_path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    // Create without truncating so restarts keep history
    OpenOptions::new().create(true).append(true).open(log_file_path)?;

    Ok(Self { log_file_path: log_file_path.to_path_buf(), silent })
  }

  fn append(&mut self, entry: &LogEntry) -> std::io::Result<()> {
    let json_line = serde_json::to_string(entry)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut file = OpenOptions::new().create(true).append(true).open(&self.log_file_path)?;
    writeln!(file, "{json_line}")?;
    file.flush()
  }

  fn read(&self, limit: Option<usize>, level_filter: Option<&str>) -> std::io::Result<Vec<LogEntry>> {
    if !self.log_file_path.exists() {
      return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&self.log_file_path)?);
    let mut logs = Vec::new();

    for line in reader.lines() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }

      // Skip malformed lines
      let Ok(entry) = serde_json::from_str::<LogEntry>(&line) else {
        continue;
      };

      if level_filter.is_none_or(|filter| filter == "all" || entry.level == filter) {
        logs.push(entry);
      }
    }

    // Keep the most recent N, oldest first
    if let Some(limit) = limit {
      let skip = logs.len().saturating_sub(limit);
      logs.drain(..skip);
    }

    Ok(logs)
  }
}

// Core API
// ========

impl DaemonLogs {
  /// Create a new thread-safe daemon log storage
  pub fn new<P: AsRef<Path>>(log_file_path: P) -> std::io::Result<Self> {
    Self::new_with_silent(log_file_path, false)
  }

  /// Create a new thread-safe daemon log storage with silent option
  pub fn new_with_silent<P: AsRef<Path>>(log_file_path: P, silent: bool) -> std::io::Result<Self> {
    let inner = DaemonLogsInner::new(log_file_path.as_ref(), silent)?;
    Ok(Self { inner: Arc::new(tokio::sync::Mutex::new(inner)) })
  }

  /// Add a log entry with optional context
  pub async fn add_log(
    &self,
    level: &str,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) -> std::io::Result<()> {
    let entry = LogEntry {
      timestamp: Utc::now(),
      level: level.to_string(),
      message: message.to_string(),
      component: component.to_string(),
      context,
    };

    let mut guard = self.inner.lock().await;
    guard.append(&entry)?;

    if !guard.silent {
      echo(level, component, message);
    }
    Ok(())
  }

  /// Retrieve logs with optional filtering and limiting
  pub async fn get_logs(
    &self,
    limit: Option<usize>,
    level_filter: Option<&str>,
  ) -> std::io::Result<Vec<LogEntry>> {
    let guard = self.inner.lock().await;
    guard.read(limit, level_filter)
  }
}

// Standard Logging Wrappers
// =========================

impl DaemonLogs {
  /// Fire-and-forget write; disk errors are echoed, never propagated
  pub async fn log(&self, level: &str, message: &str, component: &str, context: Option<LogContext>) {
    if let Err(e) = self.add_log(level, message, component, context).await {
      crate::error!("Failed to write daemon log: {e}");
    }
  }

  pub async fn info(&self, message: &str, component: &str) {
    self.log("info", message, component, None).await;
  }

  pub async fn warn(&self, message: &str, component: &str) {
    self.log("warn", message, component, None).await;
  }

  pub async fn error(&self, message: &str, component: &str) {
    self.log("error", message, component, None).await;
  }
}

fn echo(level: &str, component: &str, message: &str) {
  let line = format!("{component}: {message}");
  match level {
    "warn" => crate::warn(&line),
    "error" => crate::error(&line),
    "success" => crate::success(&line),
    "debug" => crate::debug(&line),
    "verbose" => crate::verbose(&line),
    _ => crate::info(&line),
  }
}

// Tests
// =====
