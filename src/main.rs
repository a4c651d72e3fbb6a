//! Vibecode Tutor · adaptive coding-exercise backend
//!
//! - Axum HTTP API
//! - Generates assignments per difficulty level, turns learner instructions into
//!   web pages and grades them through an OpenAI-compatible text service
//! - The learner's own API key is sent with every request; none is stored
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_STRONG_MODEL : assignment + code generation, default "gpt-4o-mini"
//!   OPENAI_FAST_MODEL   : evaluation + key probe, default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS : per-call timeout, default 90
//!   TUTOR_CONFIG_PATH   : path to TOML config (gateway, prompts, level ladder)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod levels;
mod prompts;
mod extract;
mod normalize;
mod evaluator;
mod progression;
mod openai;
mod state;
mod logic;
mod protocol;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env()?);
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vibecode_tutor", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "vibecode_tutor", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "vibecode_tutor", error = %e, "Could not listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
}
