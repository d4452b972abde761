//! Print (and optionally save) items as they arrive.

use anyhow::{Context, Result};
use clipsync_client::ClientEvent;
use clipsync_types::{parse_data_url, HistoryItem, ItemKind};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

use super::{connect, format_timestamp, ConnectArgs};
use crate::config::FileStore;

/// Run the listen command until Ctrl-C or `count` items arrived.
pub async fn run(
    store: &FileStore,
    args: &ConnectArgs,
    save_dir: Option<&Path>,
    count: Option<usize>,
) -> Result<()> {
    if let Some(dir) = save_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let client = connect(store, args).await?;
    let mut events = client.subscribe();
    eprintln!("Listening as {} (Ctrl-C to stop)...", client.settings().await?.device_name);

    let mut received = 0usize;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => break,
        };

        match event {
            Ok(ClientEvent::Received(item)) => {
                print_item(&item);
                if let (ItemKind::File, Some(dir)) = (item.kind, save_dir) {
                    match save_file(dir, &item).await {
                        Ok(path) => println!("    saved to {}", path.display()),
                        Err(e) => eprintln!("    could not save file: {e:#}"),
                    }
                }
                received += 1;
                if count.is_some_and(|n| received >= n) {
                    break;
                }
            }
            Ok(ClientEvent::StateChanged(state)) => eprintln!("[{state}]"),
            Ok(ClientEvent::PeerJoined(id)) => eprintln!("device {id} joined"),
            Ok(ClientEvent::PeerLeft(id)) => eprintln!("device {id} left"),
            Ok(ClientEvent::ConnectionFailed(error)) => eprintln!("connection failed: {error}"),
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => eprintln!("(skipped {n} events)"),
            Err(RecvError::Closed) => break,
        }
    }

    client.shutdown().await;
    Ok(())
}

fn print_item(item: &HistoryItem) {
    match item.kind {
        ItemKind::Text => println!(
            "[{}] {}: {}",
            format_timestamp(item.timestamp),
            item.sender,
            item.content
        ),
        ItemKind::File => println!(
            "[{}] {}: [file] {}",
            format_timestamp(item.timestamp),
            item.sender,
            item.file_name.as_deref().unwrap_or("unnamed")
        ),
    }
}

async fn save_file(dir: &Path, item: &HistoryItem) -> Result<PathBuf> {
    let data = parse_data_url(&item.content)?;
    let name = safe_file_name(item.file_name.as_deref().unwrap_or("received.bin"));
    let path = dir.join(name);
    tokio::fs::write(&path, &data.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Strip directories and awkward characters from a peer-supplied name.
fn safe_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();
    match cleaned.trim_start_matches('.') {
        "" => "received.bin".to_string(),
        rest => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_types::to_data_url;
    use tempfile::tempdir;

    #[test]
    fn file_names_cannot_escape_the_directory() {
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\temp\\a.txt"), "a.txt");
        assert_eq!(safe_file_name(".."), "received.bin");
        assert_eq!(safe_file_name(".bashrc"), "bashrc");
        assert_eq!(safe_file_name("photo.png"), "photo.png");
    }

    #[tokio::test]
    async fn received_files_are_written() {
        let dir = tempdir().unwrap();
        let content = to_data_url("text/plain", b"hello file").unwrap();
        let item = HistoryItem::sent(ItemKind::File, content, "phone", 1, Some("hi.txt".into()));

        let path = save_file(dir.path(), &item).await.unwrap();
        assert_eq!(path, dir.path().join("hi.txt"));
        assert_eq!(std::fs::read(path).unwrap(), b"hello file");
    }
}
