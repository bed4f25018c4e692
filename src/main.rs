//! Exam Generator Backend
//!
//! - Axum HTTP + WebSocket API
//! - Gemini or OpenAI-compatible model (via environment variables)
//! - Rate-limited generation with layered fallback content
//! - PDF / DOCX export
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   MODEL_PROVIDER     : "gemini" (default) or "openai"
//!   GOOGLE_AI_API_KEY  : Gemini API key
//!   GEMINI_MODEL       : default "gemini-1.5-flash"
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta"
//!   OPENAI_API_KEY     : OpenAI-compatible API key
//!   OPENAI_BASE_URL    : default "https://api.openai.com/v1"
//!   OPENAI_MODEL       : default "gpt-4o-mini"
//!   MODEL_TIMEOUT_SECS : per-call HTTP timeout (default 60)
//!   EXAM_CONFIG_PATH   : path to TOML config (prompts + pacing limits)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod extract;
mod model;
mod gemini;
mod openai;
mod limiter;
mod client;
mod batch;
mod logic;
mod export;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Root cancellation scope; requests and WS sessions hang child tokens off it.
  let shutdown = CancellationToken::new();

  // Build shared application state (model client, pacing, prompts).
  let state = Arc::new(AppState::from_env(shutdown.clone())?);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "examgen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;
  info!(target: "examgen_backend", "HTTP server stopped");
  Ok(())
}

/// Resolve on Ctrl-C and cancel every in-flight generation.
async fn shutdown_signal(shutdown: CancellationToken) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "examgen_backend", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "examgen_backend", "Shutdown requested; cancelling in-flight work");
  shutdown.cancel();
}
