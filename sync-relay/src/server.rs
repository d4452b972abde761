//! Main Relay coordination.
//!
//! Relay tracks connected peers and routes frames between them. It never
//! interprets clipboard content; the only frame it reads is `REGISTER`,
//! which moves a peer into a pairing room.

use crate::config::Config;
use clipsync_types::ControlMessage;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Room every peer starts in. Not a valid pairing code (codes are trimmed
/// and non-empty), so it cannot collide with one.
pub const DEFAULT_ROOM: &str = "";

/// Identifies one WebSocket connection.
pub type PeerId = u64;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Connections refused because `max_connections` was reached.
    pub connections_rejected: AtomicU64,
    /// Frames received from peers.
    pub frames_received: AtomicU64,
    /// Frame copies queued to other peers.
    pub frames_forwarded: AtomicU64,
    /// Frame copies dropped because a peer's outbox was full.
    pub frames_dropped: AtomicU64,
    /// Bytes received from peers.
    pub bytes_received: AtomicU64,
    /// Successful `REGISTER` handshakes.
    pub registrations_total: AtomicU64,
}

#[derive(Debug)]
struct Peer {
    room: String,
    device_id: Option<String>,
    outbox: mpsc::Sender<String>,
}

/// A peer that has gone away, returned so the caller can announce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartedPeer {
    /// Room the peer was in.
    pub room: String,
    /// Device id from its `REGISTER`, if any.
    pub device_id: Option<String>,
}

/// Main relay server.
pub struct Relay {
    config: Config,
    metrics: RelayMetrics,
    peers: DashMap<PeerId, Peer>,
    next_id: AtomicU64,
    started: Instant,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

impl Relay {
    /// Create a new Relay with the given config.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            metrics: RelayMetrics::default(),
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
            started: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Seconds since the relay was created.
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Whether another peer may connect.
    pub fn has_capacity(&self) -> bool {
        self.peers.len() < self.config.limits.max_connections
    }

    /// Add a peer in the default room.
    ///
    /// Returns `None` when the relay is full.
    pub fn add_peer(&self, outbox: mpsc::Sender<String>) -> Option<PeerId> {
        if !self.has_capacity() {
            self.metrics
                .connections_rejected
                .fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.peers.insert(
            id,
            Peer {
                room: DEFAULT_ROOM.to_string(),
                device_id: None,
                outbox,
            },
        );
        self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(peer = id, total = self.peers.len(), "peer added");
        Some(id)
    }

    /// Remove a peer, announcing `DEVICE_LEFT` to its pairing room.
    pub fn remove_peer(&self, id: PeerId) -> Option<DepartedPeer> {
        let (_, peer) = self.peers.remove(&id)?;
        tracing::debug!(peer = id, remaining = self.peers.len(), "peer removed");

        if let Some(device_id) = &peer.device_id {
            let left = ControlMessage::DeviceLeft {
                device_id: device_id.clone(),
            };
            self.announce(&peer.room, id, &left);
        }

        Some(DepartedPeer {
            room: peer.room,
            device_id: peer.device_id,
        })
    }

    /// Move a peer into the pairing room `code`.
    ///
    /// Acknowledges with `REGISTER_ACK` and tells the room's other members
    /// with `DEVICE_JOINED`. A peer leaving a previous pairing room is
    /// announced there with `DEVICE_LEFT`. Returns false for an unknown peer.
    pub fn register(&self, id: PeerId, code: &str, device_id: &str) -> bool {
        let (outbox, previous) = {
            let Some(mut peer) = self.peers.get_mut(&id) else {
                return false;
            };
            let old_room = std::mem::replace(&mut peer.room, code.to_string());
            let old_device = peer.device_id.replace(device_id.to_string());
            let previous = match old_device {
                Some(old_device) if old_room != code => Some((old_room, old_device)),
                _ => None,
            };
            (peer.outbox.clone(), previous)
        };

        if let Some((old_room, old_device)) = previous {
            let left = ControlMessage::DeviceLeft {
                device_id: old_device,
            };
            self.announce(&old_room, id, &left);
        }

        self.metrics
            .registrations_total
            .fetch_add(1, Ordering::Relaxed);
        tracing::info!(peer = id, device_id, "peer joined pairing room");

        if let Ok(ack) = ControlMessage::RegisterAck.to_json() {
            self.deliver(&outbox, ack);
        }
        let joined = ControlMessage::DeviceJoined {
            device_id: device_id.to_string(),
        };
        self.announce(code, id, &joined);
        true
    }

    /// Forward `text` verbatim to every other peer in the sender's room.
    ///
    /// Returns how many peers it was queued for.
    pub fn forward(&self, from: PeerId, text: &str) -> usize {
        self.metrics.frames_received.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_received
            .fetch_add(text.len() as u64, Ordering::Relaxed);

        // Clone the room out so no shard guard is held while iterating
        let Some(room) = self.peers.get(&from).map(|p| p.room.clone()) else {
            return 0;
        };
        self.fan_out(&room, from, text)
    }

    /// Number of connected peers.
    pub fn total_peers(&self) -> usize {
        self.peers.len()
    }

    /// Number of distinct pairing rooms with at least one peer.
    pub fn total_rooms(&self) -> usize {
        let mut rooms: Vec<String> = self
            .peers
            .iter()
            .filter(|p| p.room != DEFAULT_ROOM)
            .map(|p| p.room.clone())
            .collect();
        rooms.sort();
        rooms.dedup();
        rooms.len()
    }

    /// Number of peers in `room`.
    pub fn room_size(&self, room: &str) -> usize {
        self.peers.iter().filter(|p| p.room == room).count()
    }

    fn announce(&self, room: &str, exclude: PeerId, msg: &ControlMessage) {
        match msg.to_json() {
            Ok(json) => {
                self.fan_out(room, exclude, &json);
            }
            Err(e) => tracing::error!(error = %e, "failed to encode control message"),
        }
    }

    fn fan_out(&self, room: &str, exclude: PeerId, text: &str) -> usize {
        let targets: Vec<mpsc::Sender<String>> = self
            .peers
            .iter()
            .filter(|p| *p.key() != exclude && p.room == room)
            .map(|p| p.outbox.clone())
            .collect();

        targets
            .iter()
            .filter(|outbox| self.deliver(outbox, text.to_string()))
            .count()
    }

    /// Queue without waiting; a full outbox drops the frame for that peer.
    fn deliver(&self, outbox: &mpsc::Sender<String>, text: String) -> bool {
        match outbox.try_send(text) {
            Ok(()) => {
                self.metrics.frames_forwarded.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.frames_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("peer outbox full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
