//! Per-connection session handling.
//!
//! Each WebSocket gets a reader loop (this task) and a writer task draining
//! the peer's outbox, so a slow socket never blocks fan-out.

use crate::server::{PeerId, Relay};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::ConnectInfo;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use clipsync_types::{ControlMessage, PairingCode};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Upgrade handler for `/` and `/ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(relay): Extension<Arc<Relay>>,
    addr: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    if !relay.has_capacity() {
        tracing::warn!("connection limit reached, refusing upgrade");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let addr = addr.map(|ConnectInfo(addr)| addr);
    let max = relay.config().limits.max_message_size;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| run_session(socket, relay, addr))
}

/// Pump one WebSocket until it closes.
pub async fn run_session(socket: WebSocket, relay: Arc<Relay>, addr: Option<SocketAddr>) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<String>(relay.config().limits.outbox_capacity);

    let Some(id) = relay.add_peer(outbox) else {
        tracing::warn!(?addr, "connection limit reached, closing");
        let _ = sink.close().await;
        return;
    };
    tracing::info!(peer = id, ?addr, "client connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox_rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(peer = id, error = %e, "socket error");
                break;
            }
        };

        match msg {
            Message::Text(text) => handle_text(&relay, id, &text),
            Message::Binary(bytes) => handle_text(&relay, id, &String::from_utf8_lossy(&bytes)),
            Message::Close(_) => break,
            // axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    relay.remove_peer(id);
    writer.abort();
    tracing::info!(peer = id, ?addr, "client disconnected");
}

fn handle_text(relay: &Relay, id: PeerId, text: &str) {
    match classify(text) {
        Inbound::Register(code, device_id) => {
            relay.register(id, code.as_str(), &device_id);
        }
        Inbound::BadRegister => {}
        Inbound::Forward => {
            let delivered = relay.forward(id, text);
            tracing::debug!(peer = id, bytes = text.len(), delivered, "frame forwarded");
        }
    }
}

/// How the relay treats one inbound frame.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    /// `REGISTER` with a usable pairing code.
    Register(PairingCode, String),
    /// `REGISTER` the relay refuses; never forwarded.
    BadRegister,
    /// Anything else.
    Forward,
}

fn classify(text: &str) -> Inbound {
    if !text.contains("\"REGISTER\"") {
        return Inbound::Forward;
    }
    match ControlMessage::from_json(text) {
        Ok(ControlMessage::Register { pairing_code, id }) => {
            match PairingCode::parse(&pairing_code) {
                Ok(code) => Inbound::Register(code, id),
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting REGISTER");
                    Inbound::BadRegister
                }
            }
        }
        _ => Inbound::Forward,
    }
}
