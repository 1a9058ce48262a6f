//! Classroom Monitor - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = ServerConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    init_logging(&config);

    info!("=== Classroom Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        contention = ?config.contention,
        idle_timeout_secs = config.idle_timeout_secs,
        "Starting session server..."
    );

    run_server(config).await
}
