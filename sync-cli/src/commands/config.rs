//! Show and change settings.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use clipsync_client::store::{load_settings, save_settings};
use clipsync_types::Settings;

use crate::config::FileStore;

/// `clipsync config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print current settings (the secret is never shown)
    Show,

    /// Change one setting
    Set {
        /// Setting to change
        key: SettingKey,

        /// New value (prompted for secret-key when omitted)
        value: Option<String>,
    },
}

/// Settings that can be changed from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    /// Relay WebSocket URL
    ServerUrl,
    /// Name stamped on outgoing items
    DeviceName,
    /// Shared encryption secret; empty disables encryption
    SecretKey,
    /// Notifications for incoming items (true/false)
    Notifications,
    /// Sound for incoming items (true/false)
    Sound,
}

/// Run a config subcommand.
pub async fn run(store: &FileStore, action: ConfigAction) -> Result<()> {
    if !store.is_initialized() {
        anyhow::bail!("Not initialized. Run 'clipsync init' first.");
    }
    let settings = load_settings(store).await?;

    match action {
        ConfigAction::Show => show(&settings),
        ConfigAction::Set { key, value } => {
            let value = match (key, value) {
                (_, Some(value)) => value,
                (SettingKey::SecretKey, None) => {
                    super::init::prompt_secret("New secret (empty input is rejected): ")?
                }
                (_, None) => anyhow::bail!("A value is required for {:?}", key),
            };
            let updated = apply(settings, key, &value)?;
            save_settings(store, &updated)
                .await
                .context("Failed to save settings")?;
            println!("Updated.");
            show(&updated);
        }
    }
    Ok(())
}

fn show(settings: &Settings) {
    println!("  server-url:    {}", settings.server_url);
    println!("  device-name:   {}", settings.device_name);
    println!(
        "  secret-key:    {}",
        if settings.encryption_enabled() { "(set)" } else { "(not set)" }
    );
    println!("  notifications: {}", settings.enable_notifications);
    println!("  sound:         {}", settings.enable_sound);
}

/// Apply one change to a copy of `settings`.
fn apply(mut settings: Settings, key: SettingKey, value: &str) -> Result<Settings> {
    match key {
        SettingKey::ServerUrl => {
            if !(value.starts_with("ws://") || value.starts_with("wss://")) {
                anyhow::bail!("Relay URL must start with ws:// or wss://");
            }
            settings.server_url = value.to_string();
        }
        SettingKey::DeviceName => {
            if value.trim().is_empty() {
                anyhow::bail!("Device name must not be empty");
            }
            settings.device_name = value.trim().to_string();
        }
        SettingKey::SecretKey => settings.secret_key = value.to_string(),
        SettingKey::Notifications => settings.enable_notifications = parse_bool(value)?,
        SettingKey::Sound => settings.enable_sound = parse_bool(value)?,
    }
    Ok(settings)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => anyhow::bail!("Expected true or false, got '{}'", other),
    }
}
