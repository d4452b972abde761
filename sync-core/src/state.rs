//! Connection state machine for ClipSync.
//!
//! This module provides a pure, side-effect-free state machine for managing
//! the relay session lifecycle. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening sockets, arming timers) is performed by
//! clipsync-client, not by this module. This enables instant unit testing
//! without network mocks.

use std::fmt;
use std::time::Duration;

/// Fixed delay before every automatic reconnect attempt.
///
/// No backoff, no jitter, no cap: every close schedules exactly one retry.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport, nothing in flight.
    Disconnected,
    /// Transport attempt in progress, or waiting for `REGISTER_ACK`.
    Connecting,
    /// Transport open (simple variant).
    Open,
    /// Registered with the relay (pairing-code variant).
    Paired,
    /// The last attempt failed.
    Error,
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (clipsync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Explicit connect from anywhere replaces the current session
            (_, Event::ConnectRequested) => (
                Self::Connecting,
                vec![
                    Action::CancelReconnect,
                    Action::CloseTransport,
                    Action::Connect,
                ],
            ),

            // Manual disconnect from anywhere
            (_, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::CancelReconnect,
                    Action::CloseTransport,
                    Action::ClearSession,
                    Action::ClearHistory,
                ],
            ),

            // From Connecting
            (Self::Connecting, Event::TransportOpened { pairing: false }) => (Self::Open, vec![]),
            (Self::Connecting, Event::TransportOpened { pairing: true }) => {
                (Self::Connecting, vec![Action::SendRegister])
            }
            (Self::Connecting, Event::RegisterAcked) => (Self::Paired, vec![]),
            (Self::Connecting, Event::ConnectFailed { error }) => (
                Self::Error,
                vec![
                    Action::EmitEvent(SyncEvent::ConnectionFailed { error }),
                    Action::StartReconnectTimer {
                        delay: RECONNECT_DELAY,
                    },
                ],
            ),
            (Self::Connecting, Event::KeyDerivationFailed { error }) => (
                Self::Error,
                vec![Action::EmitEvent(SyncEvent::ConnectionFailed { error })],
            ),

            // Any close of a live or half-open transport schedules one retry
            (Self::Connecting | Self::Open | Self::Paired, Event::TransportClosed { reason }) => (
                Self::Disconnected,
                vec![
                    Action::EmitEvent(SyncEvent::Disconnected { reason }),
                    Action::StartReconnectTimer {
                        delay: RECONNECT_DELAY,
                    },
                ],
            ),

            // Scheduled retry
            (Self::Disconnected | Self::Error, Event::ReconnectTimer) => {
                (Self::Connecting, vec![Action::Connect])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Whether sends reach the transport.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::Paired)
    }

    /// Check if currently trying to connect.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Upper-case label used by the shells.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Paired => "PAIRED",
            Self::Error => "ERROR",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User requested a connection (simple or pairing variant).
    ConnectRequested,
    /// Transport handshake completed.
    TransportOpened {
        /// Whether a `REGISTER` exchange must follow.
        pairing: bool,
    },
    /// Transport failed to establish.
    ConnectFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Key derivation failed before any connection attempt.
    KeyDerivationFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Relay acknowledged our `REGISTER`.
    RegisterAcked,
    /// Transport closed after having been opened.
    TransportClosed {
        /// Reason for disconnection.
        reason: String,
    },
    /// User requested disconnect.
    DisconnectRequested,
    /// Reconnect timer fired.
    ReconnectTimer,
}

/// Actions to be executed by clipsync-client.
///
/// These are instructions, not side effects. clipsync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Derive the session key if needed, then open the transport.
    Connect,
    /// Send `REGISTER` with the pairing code and device id.
    SendRegister,
    /// Close the transport if one is open.
    CloseTransport,
    /// Start a timer for reconnection.
    StartReconnectTimer {
        /// Delay before attempting reconnection.
        delay: Duration,
    },
    /// Cancel any pending reconnect timer.
    CancelReconnect,
    /// Forget the pairing code and derived key.
    ClearSession,
    /// Empty the history cache.
    ClearHistory,
    /// Emit an event to the application.
    EmitEvent(SyncEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A connection attempt failed.
    ConnectionFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The transport closed.
    Disconnected {
        /// Reason for disconnection.
        reason: String,
    },
}
