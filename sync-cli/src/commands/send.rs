//! Send text or a file to other devices.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt;

use super::{connect, describe, ConnectArgs};
use crate::config::FileStore;

/// What to send.
pub enum Payload<'a> {
    /// Text given on the command line.
    Text(String),
    /// A file on disk.
    File(&'a Path),
    /// Text piped on stdin.
    Stdin,
}

/// Run the send command.
pub async fn run(store: &FileStore, payload: Payload<'_>, args: &ConnectArgs) -> Result<()> {
    // Read input before connecting so a bad path fails fast
    let prepared = match payload {
        Payload::Text(text) => Prepared::Text(text),
        Payload::Stdin => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Prepared::Text(text.trim_end_matches('\n').to_string())
        }
        Payload::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            Prepared::File {
                mime: guess_mime(&name).to_string(),
                name,
                bytes,
            }
        }
    };
    if let Prepared::Text(text) = &prepared {
        if text.is_empty() {
            anyhow::bail!("Nothing to send");
        }
    }

    let client = connect(store, args).await?;
    let result = match &prepared {
        Prepared::Text(text) => client.send_text(text).await,
        Prepared::File { name, mime, bytes } => client.send_file(name, mime, bytes).await,
    };
    client.shutdown().await;

    let report = result?;
    if report.delivered {
        println!("Sent: {}", describe(&report.item));
    } else {
        anyhow::bail!("Connection dropped before the item was sent");
    }
    Ok(())
}

enum Prepared {
    Text(String),
    File {
        name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// MIME type from a file extension.
fn guess_mime(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "md" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime("notes.txt"), "text/plain");
        assert_eq!(guess_mime("Makefile"), "application/octet-stream");
        assert_eq!(guess_mime("archive.tar.gz"), "application/octet-stream");
    }
}
