//! # clipsync-client
//!
//! Client library for ClipSync clipboard and file sharing.
//!
//! This is the library applications embed to exchange clipboard items
//! with other devices through a relay.
//!
//! ## Features
//!
//! - **Optional encryption**: PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM
//! - **Pairing sessions**: relay-side rooms keyed by a shared pairing code
//! - **Transport Abstraction**: Pluggable transport layer (WebSocket, mock)
//! - **Pure State Machine**: Uses clipsync-core for side-effect-free logic
//! - **Persistence**: settings and history behind a key-value store trait
//!
//! ## Example
//!
//! ```ignore
//! use clipsync_client::{ClientEvent, SyncClient, WebSocketTransport};
//! use clipsync_types::Settings;
//!
//! let settings = Settings::default().with_secret_key("correct horse");
//! let client = SyncClient::new(settings, WebSocketTransport::new());
//! let mut events = client.subscribe();
//!
//! client.connect().await?;
//! client.wait_until_open().await?;
//! client.send_text("copied on my laptop").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ClientEvent::Received(item) = event {
//!         println!("{}: {}", item.sender, item.content);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod crypto;
pub mod store;
pub mod transport;

pub use client::{ClientError, ClientEvent, SendReport, SyncClient};
pub use crypto::{
    CryptoError, Sealed, SecretKey, DECRYPTION_FAILED_PLACEHOLDER, ENCRYPTED_PLACEHOLDER,
    KEY_SIZE, NONCE_SIZE,
};
pub use store::{KeyValueStore, MemoryStore, StoreError, HISTORY_KEY, SETTINGS_KEY};
pub use transport::{MockTransport, Transport, TransportError, WebSocketTransport};
