//! Prometheus metrics endpoint.

use crate::server::Relay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<Relay>>) -> impl IntoResponse {
    let m = relay.metrics();

    // Gauges
    let connections = relay.total_peers();
    let rooms = relay.total_rooms();

    // Counters
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let conns_rejected = m.connections_rejected.load(Ordering::Relaxed);
    let frames_rx = m.frames_received.load(Ordering::Relaxed);
    let frames_fwd = m.frames_forwarded.load(Ordering::Relaxed);
    let frames_dropped = m.frames_dropped.load(Ordering::Relaxed);
    let bytes_rx = m.bytes_received.load(Ordering::Relaxed);
    let registrations = m.registrations_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP clipsync_relay_connections_active Number of connected peers
# TYPE clipsync_relay_connections_active gauge
clipsync_relay_connections_active {connections}

# HELP clipsync_relay_rooms_active Number of active pairing rooms
# TYPE clipsync_relay_rooms_active gauge
clipsync_relay_rooms_active {rooms}

# HELP clipsync_relay_info Server information
# TYPE clipsync_relay_info gauge
clipsync_relay_info{{version="{version}"}} 1

# HELP clipsync_relay_connections_total Total connections accepted
# TYPE clipsync_relay_connections_total counter
clipsync_relay_connections_total {conns_total}

# HELP clipsync_relay_connections_rejected_total Connections refused at the connection limit
# TYPE clipsync_relay_connections_rejected_total counter
clipsync_relay_connections_rejected_total {conns_rejected}

# HELP clipsync_relay_frames_received_total Frames received from peers
# TYPE clipsync_relay_frames_received_total counter
clipsync_relay_frames_received_total {frames_rx}

# HELP clipsync_relay_frames_forwarded_total Frame copies queued to peers
# TYPE clipsync_relay_frames_forwarded_total counter
clipsync_relay_frames_forwarded_total {frames_fwd}

# HELP clipsync_relay_frames_dropped_total Frame copies dropped on full outboxes
# TYPE clipsync_relay_frames_dropped_total counter
clipsync_relay_frames_dropped_total {frames_dropped}

# HELP clipsync_relay_bytes_received_total Bytes received from peers
# TYPE clipsync_relay_bytes_received_total counter
clipsync_relay_bytes_received_total {bytes_rx}

# HELP clipsync_relay_registrations_total Pairing registrations
# TYPE clipsync_relay_registrations_total counter
clipsync_relay_registrations_total {registrations}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
