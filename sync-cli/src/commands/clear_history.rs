//! Clear stored history after confirmation.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_client;
use crate::config::FileStore;

/// Run the clear-history command.
pub async fn run(store: &FileStore, yes: bool) -> Result<()> {
    let client = load_client(store).await?;
    let result = client
        .clear_history(|count| async move {
            if count == 0 {
                return false;
            }
            yes || confirm(count).await
        })
        .await;
    client.shutdown().await;

    match result? {
        0 => println!("Nothing cleared."),
        n => println!("Cleared {n} items."),
    }
    Ok(())
}

async fn confirm(count: usize) -> bool {
    print!("Delete {count} history items? [y/N] ");
    let _ = std::io::Write::flush(&mut std::io::stdout());

    let mut line = String::new();
    match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        Ok(_) => is_yes(&line),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
