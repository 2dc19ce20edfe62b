//! REST server startup and configuration

use anyhow::{anyhow, Result};
use axum::serve;
use bentley::daemon_logs::DaemonLogs;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ReelmatchConfig;
use crate::server::routing::create_router;
use crate::server::services::context::AppContext;
use crate::server::services::recommender::Recommender;

const COMPONENT: &str = "reelmatch-server";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
  pub recommender: Recommender,
  pub logs: Arc<DaemonLogs>,
  pub config: Arc<ReelmatchConfig>,
}

impl AppState {
  pub fn new(context: &AppContext, logs: Arc<DaemonLogs>, config: ReelmatchConfig) -> Self {
    Self { recommender: context.recommender(), logs, config: Arc::new(config) }
  }
}

/// Start the REST server
///
/// The store and model are loaded before the listener binds; if either fails
/// the server never starts.
pub async fn start_server(config: ReelmatchConfig, addr: SocketAddr) -> Result<()> {
  let daemon_logs = Arc::new(DaemonLogs::new(config.server_logs_path())?);
  daemon_logs.info(&format!("Starting reelmatch REST server on {addr}"), COMPONENT).await;

  let context = match AppContext::initialize(&config).await {
    Ok(context) => context,
    Err(e) => {
      daemon_logs.error(&format!("Startup failed: {e}"), COMPONENT).await;
      return Err(anyhow!("Startup failed: {e}"));
    }
  };

  let movies = context.store().count().await.unwrap_or_default();
  daemon_logs
    .info(&format!("Serving collection '{}' ({movies} movies)", config.collection), COMPONENT)
    .await;

  let state = AppState::new(&context, daemon_logs.clone(), config);
  let app = create_router(state).layer(
    ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
  );

  let listener = TcpListener::bind(addr).await?;
  daemon_logs.info(&format!("Server listening on {addr}"), COMPONENT).await;

  match serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
    Ok(_) => {
      daemon_logs.info("Server shutdown gracefully", COMPONENT).await;
      Ok(())
    }
    Err(e) => {
      daemon_logs.error(&format!("Server error: {e}"), COMPONENT).await;
      Err(anyhow!("Server error: {}", e))
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    bentley::warn!("Failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
}
