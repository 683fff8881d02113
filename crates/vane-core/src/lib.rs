//! Core types for the Vane weather proxy.
//!
//! Provides configuration loading, the shared error taxonomy, and
//! tracing bootstrap used by the server binary.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Upstream, WeatherError};

use anyhow::Result;

/// Initialize tracing for the whole process.
///
/// Honors `RUST_LOG`; defaults to `info` when unset.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Vane core initialized");
    Ok(())
}
