//! Thin HTTP layer over the weather pipeline.
//!
//! Routing, serialization, and process bootstrap only; all weather and
//! resilience behavior lives in the library crates underneath.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod routes;
pub mod state;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;

use vane_core::Config;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(routes::get_weather))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let state = state::build(&config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "vane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
}
