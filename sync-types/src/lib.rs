//! # sync-types
//!
//! Wire format types for the ClipSync clipboard relay protocol.
//!
//! This crate provides the foundational types used across all ClipSync crates:
//! - [`SyncMessage`] - The JSON envelope exchanged through the relay
//! - [`ControlMessage`] - Pairing-code control frames (`REGISTER`, `REGISTER_ACK`, ...)
//! - [`HistoryItem`] - A sent or received clipboard entry
//! - [`Settings`] - Persisted user settings
//! - [`DeviceId`], [`PairingCode`] - Identity types
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod control;
mod error;
mod file;
mod history;
mod ids;
mod message;
mod settings;

pub use control::ControlMessage;
pub use error::SyncError;
pub use file::{parse_data_url, to_data_url, DataUrl, MAX_FILE_SIZE};
pub use history::{HistoryItem, ItemKind, HISTORY_CAPACITY};
pub use ids::{DeviceId, PairingCode};
pub use message::{now_millis, MessageKind, SyncMessage};
pub use settings::{Settings, DEFAULT_SERVER_URL};

/// Application name shown by the shells.
pub const APP_NAME: &str = "ClipSync";

/// Default relay port.
pub const DEFAULT_PORT: u16 = 4000;
