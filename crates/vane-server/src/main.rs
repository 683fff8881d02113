use anyhow::{Context, Result};

use vane_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    vane_core::init()?;

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        geocoding = %config.geocoding_base_url,
        forecast = %config.forecast_base_url,
        cache_ttl = ?config.cache_ttl,
        "starting vane"
    );

    vane_server::run(config).await
}
