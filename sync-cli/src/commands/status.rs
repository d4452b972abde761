//! Show local state and, optionally, relay reachability.

use anyhow::Result;
use clipsync_client::store::{load_history, load_settings};

use super::{connect, ConnectArgs};
use crate::config::FileStore;

/// Run the status command.
pub async fn run(store: &FileStore, check: bool, args: &ConnectArgs) -> Result<()> {
    println!("=== clipsync status ===");
    println!();

    if !store.is_initialized() {
        println!("Device: NOT INITIALIZED");
        println!();
        println!("Run 'clipsync init' to initialize.");
        return Ok(());
    }

    let settings = load_settings(store).await?;
    let history = load_history(store).await?;

    println!("Device:");
    println!("  Name:       {}", settings.device_name);
    println!("  Relay:      {}", settings.server_url);
    println!(
        "  Encryption: {}",
        if settings.encryption_enabled() { "on" } else { "off" }
    );
    println!("  History:    {} items", history.len());
    println!("  Data dir:   {}", store.dir().display());
    println!();

    if check {
        println!("Connection:");
        match connect(store, args).await {
            Ok(client) => {
                println!("  Status: {}", client.state().as_str().to_uppercase());
                client.shutdown().await;
            }
            Err(e) => println!("  Status: UNREACHABLE ({e})"),
        }
    }

    Ok(())
}
