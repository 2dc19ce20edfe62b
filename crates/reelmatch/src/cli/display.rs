//! Display formatting utilities for CLI output

use colored::*;

use crate::server::models::movie::Recommendations;
use crate::server::types::LogEntry;

/// Print a numbered recommendation list, nearest first
pub fn display_recommendations(heading: &str, recommendations: &Recommendations) {
  if recommendations.is_empty() {
    println!("No recommendations found for {}", heading.yellow());
    return;
  }

  println!("{} Recommendations for {}:", "🎬".cyan(), heading.yellow());
  let width = recommendations.len().to_string().len();
  for (index, entry) in recommendations.entries.iter().enumerate() {
    println!(
      "  {:>width$}. {} {}",
      index + 1,
      entry.title.bold(),
      format_distance(entry.distance).dimmed(),
      width = width
    );
  }
}

pub fn format_distance(distance: f32) -> String {
  format!("(distance {distance:.4})")
}

/// Print one daemon log entry with its request context
pub fn display_log_entry(log: &LogEntry) {
  let level_colored = match log.level.as_str() {
    "error" => log.level.red().bold(),
    "warn" => log.level.yellow().bold(),
    "info" => log.level.blue().bold(),
    "success" => log.level.bright_green().bold(),
    _ => log.level.normal(),
  };

  println!("{} [{}] {}", log.timestamp.to_string().cyan(), level_colored, log.message);

  let Some(context) = &log.context else {
    return;
  };

  let mut context_parts = Vec::new();
  if let Some(request_id) = &context.request_id {
    context_parts.push(format!("request_id: {}", request_id.bright_blue()));
  }
  if let Some(method) = &context.method {
    context_parts.push(format!("method: {}", method.magenta().bold()));
  }
  if let Some(path) = &context.path {
    context_parts.push(format!("path: {}", path.cyan()));
  }
  if let Some(status_code) = context.status_code {
    let status_color = match status_code {
      200..=299 => status_code.to_string().green(),
      300..=399 => status_code.to_string().yellow(),
      400..=499 => status_code.to_string().red(),
      _ => status_code.to_string().bright_red().bold(),
    };
    context_parts.push(format!("status: {status_color}"));
  }
  if let Some(duration) = context.duration_ms {
    context_parts.push(format!("duration: {}", format!("{duration:.2}ms").green()));
  }

  if !context_parts.is_empty() {
    for part in context_parts {
      println!("  {} {}", "└─".white().dimmed(), part);
    }
    println!();
  }
}
