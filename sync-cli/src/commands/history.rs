//! Show stored history.

use anyhow::Result;
use clipsync_client::store::load_history;

use super::{describe, format_timestamp};
use crate::config::FileStore;

/// Run the history command.
pub async fn run(store: &FileStore, limit: usize, json: bool) -> Result<()> {
    let history = load_history(store).await?;
    let items: Vec<_> = history.iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("History is empty.");
        return Ok(());
    }

    println!("{} of {} items (newest first):", items.len(), history.len());
    for item in items {
        println!("  {}  ({})", describe(item), format_timestamp(item.timestamp));
    }
    println!();
    println!("Re-send a text item with: clipsync restore <id>");
    Ok(())
}
