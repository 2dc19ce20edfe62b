//! ## Features
//!
//! - Standard logging levels (info, warn, error, debug, verbose, success)
//! - Multi-line message support with consistent prefixes
//! - Runtime switch for verbose/debug chatter
//! - All output to stderr, so stdout stays clean for command results
//!
//! ## Usage
//!
//! The macros take `format!` arguments: `bentley::info!("loaded {} movies", count)`.
//! Persistent JSONL logging for long-running servers lives in [`daemon_logs`].

use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable verbose and debug output
pub fn set_verbose(enabled: bool) {
  VERBOSE.store(enabled, Ordering::Relaxed);
}

/// Whether verbose and debug output is currently shown
pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(color: Color, prefix: &str) -> String {
  let padding = 7usize.saturating_sub(prefix.len() + 2);
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = padding)
}

fn log_prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Verbose logging - only shown once verbose output is switched on
pub fn verbose(message: &str) {
  if is_verbose() {
    log_prefixed(Color::Cyan, "verb", message);
  }
}

/// Info level logging - general information
pub fn info(message: &str) {
  log_prefixed(Color::Blue, "info", message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log_prefixed(Color::Yellow, "warn", message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log_prefixed(Color::Red, "error", message);
}

/// Debug level logging - detailed diagnostic information
pub fn debug(message: &str) {
  if is_verbose() {
    log_prefixed(Color::Magenta, "debug", message);
  }
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log_prefixed(Color::Green, "sccs", message);
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

/// Daemon logging infrastructure - available with "daemon-logs" feature
#[cfg(feature = "daemon-logs")]
pub mod daemon_logs;
