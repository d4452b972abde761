//! clipsync-relay binary entry point.
//!
//! Usage:
//! ```bash
//! clipsync-relay --config relay.toml
//! clipsync-relay --port 4000
//! ```

use anyhow::Context;
use clap::Parser;
use clipsync_relay::{Config, Relay};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Stateless WebSocket relay for ClipSync.
#[derive(Parser)]
#[command(name = "clipsync-relay", version, about)]
struct Args {
    /// Configuration file (missing file means defaults)
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config)?;
    let addr = config.bind_addr(args.port)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "ClipSync relay listening on ws://{addr}");

    let relay = Arc::new(Relay::new(config));
    clipsync_relay::serve(listener, relay, shutdown_signal()).await?;

    tracing::info!("relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
