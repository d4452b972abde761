//! # clipsync-relay
//!
//! Stateless WebSocket relay for ClipSync.
//!
//! This crate implements a relay server that:
//! - Accepts WebSocket connections from any number of devices
//! - Forwards every frame verbatim to all other connected devices
//! - Groups pairing-code devices into rooms via `REGISTER`
//! - Never stores, decrypts or inspects clipboard content
//!
//! ## Architecture
//!
//! ```text
//! Device A ──┐                    ┌── Device B
//!            │     WebSocket      │
//!            ├───────────────────►│
//!            │                    │
//!        ┌───┴────────────────────┴───┐
//!        │       clipsync-relay       │
//!        │  peers: id → room, outbox  │
//!        └────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `/`, `/ws`: WebSocket upgrade
//! - `/health`: JSON status
//! - `/metrics`: Prometheus text

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod session;

pub use config::{Config, ConfigError};
pub use error::{RelayError, Result};
pub use server::{Relay, RelayMetrics};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    relay: Arc<Relay>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = http::build_router(relay);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
