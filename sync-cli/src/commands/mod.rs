//! CLI command implementations.

pub mod clear_history;
pub mod config;
pub mod history;
pub mod init;
pub mod listen;
pub mod pair_code;
pub mod restore;
pub mod send;
pub mod status;

use anyhow::{Context, Result};
use clap::Args;
use clipsync_client::{SyncClient, WebSocketTransport};
use clipsync_types::{HistoryItem, ItemKind};
use std::sync::Arc;
use std::time::Duration;

use crate::config::FileStore;

/// How to reach the relay.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Join a pairing session with this code instead of using the shared secret
    #[arg(long)]
    pub pair: Option<String>,

    /// Relay URL (defaults to the configured one)
    #[arg(long)]
    pub server: Option<String>,

    /// Seconds to wait for the connection
    #[arg(long, default_value = "10")]
    pub timeout: u64,
}

/// Load the client from `store` without connecting.
pub async fn load_client(store: &FileStore) -> Result<SyncClient> {
    if !store.is_initialized() {
        anyhow::bail!("Not initialized. Run 'clipsync init' first.");
    }
    SyncClient::load(WebSocketTransport::new(), Arc::new(store.clone()))
        .await
        .context("Failed to load client state")
}

/// Load the client and wait until the session is open.
pub async fn connect(store: &FileStore, args: &ConnectArgs) -> Result<SyncClient> {
    let client = load_client(store).await?;

    match (&args.pair, &args.server) {
        (Some(code), server) => client.connect_paired(code, server.as_deref()).await?,
        (None, Some(server)) => client.connect_to(server).await?,
        (None, None) => client.connect().await?,
    }

    let state = tokio::time::timeout(Duration::from_secs(args.timeout), client.wait_until_open())
        .await
        .map_err(|_| anyhow::anyhow!("Timed out connecting to relay after {}s", args.timeout))??;
    tracing::debug!(%state, "connected");
    Ok(client)
}

/// One-line summary of a history item.
pub fn describe(item: &HistoryItem) -> String {
    let who = if item.is_self { "you" } else { item.sender.as_str() };
    let body = match item.kind {
        ItemKind::File => format!(
            "[file] {}",
            item.file_name.as_deref().unwrap_or("unnamed")
        ),
        ItemKind::Text => preview(&item.content, 60),
    };
    format!("{}  {:<12}  {}", short_id(&item.id), who, body)
}

/// First eight characters of an item id.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Single-line preview of at most `max` characters.
fn preview(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

/// Format a millisecond timestamp relative to now.
pub fn format_timestamp(ts_millis: u64) -> String {
    let now = clipsync_types::now_millis() / 1000;
    let diff = now.saturating_sub(ts_millis / 1000);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
