use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reelmatch::cli::commands;
use reelmatch::config::ReelmatchConfig;
use reelmatch::server::services::ingest::DEFAULT_TITLE_COLUMN;

#[derive(Parser)]
#[command(name = "reelmatch")]
#[command(about = "Reelmatch - Movie Recommendations\nFind movies by a title you liked or by describing what you want")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  /// Show verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load precomputed embeddings and titles into the collection
  Ingest {
    /// NumPy matrix of embeddings, one row per movie
    embeddings: PathBuf,
    /// CSV file with a header row and one movie per row
    titles: PathBuf,
    /// Name of the CSV column holding titles
    #[arg(long, default_value = DEFAULT_TITLE_COLUMN)]
    title_column: String,
  },
  /// Recommend movies similar to one you already know
  Title {
    /// Exact title of a stored movie
    title: String,
    /// Number of recommendations
    #[arg(short = 'n', long)]
    top_n: Option<usize>,
  },
  /// Recommend movies matching a description
  Describe {
    /// What you'd like to watch
    #[arg(required = true)]
    description: Vec<String>,
    /// Number of recommendations
    #[arg(short = 'n', long)]
    top_n: Option<usize>,
  },
  /// Show how many movies are stored
  Count,
  /// Show recent server logs
  Logs {
    /// Maximum number of log entries to return
    #[arg(short, long, default_value = "50")]
    limit: usize,
    /// Filter by log level (info, warn, error, success, all)
    #[arg(long, default_value = "all")]
    level: String,
  },
}

async fn handle(config: &ReelmatchConfig, command: Command) -> Result<()> {
  match command {
    Command::Ingest { embeddings, titles, title_column } => {
      commands::ingest(config, &embeddings, &titles, &title_column).await
    }
    Command::Title { title, top_n } => commands::recommend_by_title(config, &title, top_n).await,
    Command::Describe { description, top_n } => {
      commands::recommend_by_description(config, &description.join(" "), top_n).await
    }
    Command::Count => commands::count(config).await,
    Command::Logs { limit, level } => commands::logs(config, limit, &level).await,
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::set_verbose(cli.verbose);

  let config = ReelmatchConfig::load()?;
  handle(&config, cli.command).await?;
  Ok(())
}
