//! # simplexd
//!
//! Chat gateway server binary — wires the config store, the live provider
//! factory, and the WebSocket gateway together, then serves until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use simplex_llm::gemini::LiveProviderFactory;
use simplex_server::config::ServerConfig;
use simplex_server::context::SessionContext;
use simplex_server::server::SimplexServer;
use simplex_settings::store::{config_path, ConfigStore};
use tracing_subscriber::EnvFilter;

/// Streaming chat gateway server.
#[derive(Parser, Debug)]
#[command(name = "simplexd", about = "Streaming chat gateway server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Path to the AI configuration file (default `~/.simplex/config.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(ConfigStore::new(args.config.unwrap_or_else(config_path)));
    if store.load().is_none() {
        tracing::info!(path = %store.path().display(), "no AI configuration yet — clients can set one over the wire");
    }

    let ctx = SessionContext::new(store, Arc::new(LiveProviderFactory));
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };

    let server = SimplexServer::new(config, ctx);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!(%addr, "simplexd ready");

    let shutdown = server.shutdown().clone();
    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            shutdown.shutdown();
        }
    }));

    handle.await.context("server task failed")?;
    Ok(())
}
