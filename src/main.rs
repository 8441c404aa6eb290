//! cwdesk - MCP server for ConnectWise Manage backup ticket triage
//!
//! Serves the backup ticket tools over stdio. Configuration comes from
//! `CW_*` environment variables or a `.env` file; see the crate docs.

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use cwdesk::config::Config;
use cwdesk::cw_client::CwClient;
use cwdesk::server::CwDeskServer;

/// Logs go to stderr; stdout carries MCP JSON-RPC.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cwdesk=info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting cwdesk");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(base_url = %config.base_url, board = %config.backup_board, "Configuration loaded");

    let client = CwClient::new(&config).context("Failed to create ConnectWise client")?;

    // A failed connection test is not fatal: tools report their own errors once ConnectWise is reachable.
    if let Err(e) = client.check_connection().await {
        tracing::warn!(error = %e, "ConnectWise connection test failed, serving anyway");
    }

    let service = CwDeskServer::new(client)
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Failed to start MCP service"))
        .context("Failed to start server")?;

    tracing::info!("Serving MCP over stdio");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");
    Ok(())
}
