//! Transport abstraction for ClipSync.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (WebSocket, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` opens a session to a relay URL
//! - `send()` transmits one frame
//! - `recv()` waits for the next frame
//! - `close()` gracefully terminates
//!
//! All methods take `&self` so one task can sit in `recv()` while another
//! sends.
//!
//! # Example
//!
//! ```ignore
//! let transport = WebSocketTransport::new();
//! transport.connect("ws://localhost:4000").await?;
//! transport.send(Frame::Text(json)).await?;
//! let frame = transport.recv().await?;
//! ```

mod mock;
mod websocket;

pub use mock::MockTransport;
pub use websocket::WebSocketTransport;

use async_trait::async_trait;
use clipsync_core::Frame;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Transport trait for exchanging frames with a relay.
///
/// Implementations handle the underlying connection mechanism
/// (WebSocket, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect to the relay at `url`.
    ///
    /// Any previous session is replaced.
    async fn connect(&self, url: &str) -> Result<(), TransportError>;

    /// Send one frame over the connection.
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Receive the next frame.
    ///
    /// Blocks until data is available or the connection closes.
    async fn recv(&self) -> Result<Frame, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
