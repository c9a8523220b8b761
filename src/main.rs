//! BoxTally - production counter dashboard backend.
//!
//! Reconstructs per-day production history for industrial counter devices
//! from the V-BOX cloud API and serves it over HTTP.

mod config;
mod db;
mod history;
mod pipeline;
mod tz;
mod vbox;
mod web;

use config::ServerConfig;
use db::Store;
use vbox::KeepAliveGate;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Devices are nudged at most once per minute.
const KEEPALIVE_INTERVAL_MS: i64 = 60_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("boxtally=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting BoxTally on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);
    tracing::info!("Vendor region: {}", cfg.vbox_region);
    if cfg.vbox_comid.is_empty() {
        tracing::warn!("BOXTALLY_VBOX_COMID is not set; vendor requests will be rejected");
    }

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Per-device keep-alive throttle shared by all requests
    let keepalive = Arc::new(KeepAliveGate::new(KEEPALIVE_INTERVAL_MS));

    // Start web server
    let server = Server::new(cfg, store, keepalive);
    server.start().await?;

    Ok(())
}
