//! Mock transport for testing.
//!
//! Allows pushing inbound frames, simulating relay drops, and capturing
//! sent frames for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use clipsync_core::Frame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the client
/// owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    dropped: bool,
    connected_address: Option<String>,
    connect_count: usize,
    sent_frames: Vec<Frame>,
    receive_queue: VecDeque<Frame>,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a frame to the next `recv()` call.
    pub fn push_incoming(&self, frame: Frame) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(frame);
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Convenience for pushing a text frame.
    pub fn push_text(&self, text: &str) {
        self.push_incoming(Frame::Text(text.to_string()));
    }

    /// Simulate the relay closing the connection.
    ///
    /// A pending `recv()` returns [`TransportError::ConnectionClosed`].
    pub fn drop_connection(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.dropped = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    /// Get all frames that were sent.
    pub fn sent_frames(&self) -> Vec<Frame> {
        let inner = self.inner.lock().unwrap();
        inner.sent_frames.clone()
    }

    /// Get the text of all sent text frames.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent_frames()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Text(t) => Some(t),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<Frame> {
        let inner = self.inner.lock().unwrap();
        inner.sent_frames.last().cloned()
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_address.clone()
    }

    /// Number of successful `connect()` calls.
    pub fn connect_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }

    /// Clear all state (frames, queue, connection).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
        drop(inner);
        self.notify.notify_waiters();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.dropped = false;
        inner.connect_count += 1;
        inner.connected_address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_frames.push(frame);
        Ok(())
    }

    async fn recv(&self) -> Result<Frame, TransportError> {
        loop {
            // Register before checking so a push between check and await is not missed
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().unwrap();

                if inner.dropped {
                    return Err(TransportError::ConnectionClosed);
                }
                if !inner.connected {
                    return Err(TransportError::NotConnected);
                }

                // Check for forced failure
                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }

                if let Some(frame) = inner.receive_queue.pop_front() {
                    return Ok(frame);
                }
            }
            notified.await;
        }
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        drop(inner);
        self.notify.notify_waiters();
        Ok(())
    }
}
