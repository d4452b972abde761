//! Re-send a text item from history.

use anyhow::Result;
use clipsync_client::store::load_history;

use super::{connect, describe, ConnectArgs};
use crate::config::FileStore;

/// Run the restore command. `id` may be any unique prefix.
pub async fn run(store: &FileStore, id: &str, args: &ConnectArgs) -> Result<()> {
    let history = load_history(store).await?;
    let ids: Vec<String> = history.iter().map(|item| item.id.clone()).collect();
    let full_id = resolve_id(&ids, id)?;

    let client = connect(store, args).await?;
    let result = client.restore(&full_id).await;
    client.shutdown().await;

    let report = result?;
    if !report.delivered {
        anyhow::bail!("Connection dropped before the item was sent");
    }
    println!("Re-sent: {}", describe(&report.item));
    Ok(())
}

/// Find the single id starting with `prefix`.
fn resolve_id(ids: &[String], prefix: &str) -> Result<String> {
    let matches: Vec<&String> = ids.iter().filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [] => anyhow::bail!("No history item matches '{}'", prefix),
        [one] => Ok((*one).clone()),
        _ => anyhow::bail!("'{}' matches {} items; use more characters", prefix, matches.len()),
    }
}
