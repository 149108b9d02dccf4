//! # sealreg-api — Binary Entry Point
//!
//! Loads configuration from the environment, opens the registry (restoring
//! the snapshot when one is configured) and serves the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use sealreg_api::state::{registry_config_from_env, AppConfig, AppState};
use sealreg_registry::Registry;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("SEALREG_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let registry_config = registry_config_from_env()?;
    tracing::info!(
        registry_id = %registry_config.registry_id,
        coprocessor_key = %registry_config.coprocessor_key.to_hex(),
        disclosure_authority = %registry_config.disclosure_authority.to_hex(),
        snapshot = ?registry_config.snapshot_path,
        "registry configuration loaded"
    );
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, authentication disabled");
    }

    let registry = Registry::open(registry_config).context("opening registry")?;

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let port = config.port;
    let state = AppState::new(Arc::new(registry), config).with_prometheus(prometheus);
    let app = sealreg_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "sealed registry API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
