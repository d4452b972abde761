//! # sync-core
//!
//! Pure logic for ClipSync (no I/O, instant tests).
//!
//! This crate implements the connection state machine, the inbound frame
//! decoder and the bounded history without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (WebSocket, storage) is performed by `clipsync-client`, which
//! interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod history;
pub mod pairing;
pub mod state;

pub use codec::{decode_frame, encode, encode_control, is_echo, DecodeError, Decoded, Frame};
pub use history::{ClearRequest, HistoryCache};
pub use pairing::{generate_pairing_code, normalize_pairing_code, PairingError};
pub use state::{Action, ConnectionState, Event, SyncEvent, RECONNECT_DELAY};
