//! Reelmatch REST Server
//!
//! HTTP API exposing title and description recommendations to
//! conversational agents.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use reelmatch::config::ReelmatchConfig;
use reelmatch::server::startup::start_server;

#[derive(Parser)]
#[command(name = "reelmatch_server")]
#[command(about = "Reelmatch REST API Server")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Args {
  /// Server bind address, overrides the configured one
  #[arg(long)]
  bind: Option<SocketAddr>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  bentley::set_verbose(args.verbose);

  // Lance and DataFusion are chatty at info level
  let filter = if args.verbose {
    EnvFilter::new("info,lance=warn,lance_datafusion=warn,datafusion=warn")
  } else {
    EnvFilter::new("reelmatch=info,lance=error,lance_datafusion=error,datafusion=error,warn")
  };

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let config = ReelmatchConfig::load()?;
  let bind = args.bind.unwrap_or(config.bind);

  bentley::info!("Starting Reelmatch REST Server v{}", env!("CARGO_PKG_VERSION"));
  bentley::info!("Binding to address: {bind}");

  start_server(config, bind).await
}
