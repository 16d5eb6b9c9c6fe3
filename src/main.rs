//! Quizdesk · local-first quiz workflow gateway
//!
//! - Axum HTTP API for quiz taking, authoring, attempts, and auth
//! - Remote-first persistence against the upstream quiz API (reqwest)
//! - Local JSON-file fallback tier under the data directory
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   UPSTREAM_API_BASE : upstream API base URL (default "http://localhost:5000/api")
//!   QUIZDESK_DATA_DIR : local store directory (default "./data")
//!   QUIZDESK_CONFIG_PATH : path to TOML config file
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod store;
mod remote;
mod logic;
mod state;
mod authoring;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (local store, upstream client, config).
  let cfg = config::load_config();
  let port = cfg.port;
  let state = Arc::new(AppState::new(cfg)?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizdesk", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
