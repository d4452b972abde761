//! Initialize local settings.

use anyhow::{Context, Result};
use clipsync_client::store::save_settings;
use clipsync_types::Settings;

use crate::config::FileStore;

/// Run the init command.
pub async fn run(
    store: &FileStore,
    name: Option<&str>,
    server: Option<&str>,
    secret: Option<String>,
) -> Result<()> {
    // Check if already initialized
    if store.is_initialized() {
        anyhow::bail!(
            "Already initialized in {}. Use 'clipsync config set' to change settings.",
            store.dir().display()
        );
    }

    let mut settings = Settings::default();
    if let Some(name) = name {
        settings = settings.with_device_name(name);
    }
    if let Some(server) = server {
        settings = settings.with_server_url(server);
    }
    if let Some(secret) = secret {
        settings = settings.with_secret_key(secret);
    }

    save_settings(store, &settings)
        .await
        .context("Failed to save settings")?;

    println!("ClipSync initialized!");
    println!();
    println!("  Device name: {}", settings.device_name);
    println!("  Relay:       {}", settings.server_url);
    println!(
        "  Encryption:  {}",
        if settings.encryption_enabled() { "on" } else { "off" }
    );
    println!("  Data dir:    {}", store.dir().display());
    println!();
    println!("Next steps:");
    println!("  1. Start a relay:        clipsync-relay");
    println!("  2. Listen for items:     clipsync listen");
    println!("  3. Send from elsewhere:  clipsync send \"hello\"");

    Ok(())
}

/// Prompt for a secret without echo.
pub fn prompt_secret(prompt: &str) -> Result<String> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read secret")?;
    let trimmed = secret.trim().to_string();
    if trimmed.is_empty() {
        anyhow::bail!("Secret must not be empty");
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_client::store::load_settings;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_writes_settings() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        run(&store, Some("Test Device"), Some("ws://relay:4000"), None)
            .await
            .unwrap();

        assert!(store.is_initialized());
        let settings = load_settings(&store).await.unwrap();
        assert_eq!(settings.device_name, "Test Device");
        assert_eq!(settings.server_url, "ws://relay:4000");
        assert!(!settings.encryption_enabled());
    }

    #[tokio::test]
    async fn init_uses_generated_name_by_default() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        run(&store, None, None, Some("k".into())).await.unwrap();

        let settings = load_settings(&store).await.unwrap();
        assert!(settings.device_name.starts_with("Web-Client-"));
        assert!(settings.encryption_enabled());
    }

    #[tokio::test]
    async fn init_fails_if_already_initialized() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        // First init should succeed
        run(&store, Some("Device 1"), None, None).await.unwrap();

        // Second init should fail
        let result = run(&store, Some("Device 2"), None, None).await;
        assert!(result.is_err());
    }
}
