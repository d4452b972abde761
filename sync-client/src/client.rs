//! SyncClient - the main interface for ClipSync.
//!
//! This module provides [`SyncClient`], the connection manager applications
//! use to share clipboard content through a relay.
//!
//! # Architecture
//!
//! One driver task owns the transport, the connection state machine, the
//! session key, the reconnect timer and the history. Every input (user
//! commands, inbound frames, transport closes, timer ticks) arrives on one
//! channel and is handled to completion before the next, so state never
//! needs locking.
//!
//! ```text
//! SyncClient ──commands──▶ driver ──frames──▶ Transport ──▶ relay
//!                            ▲  │
//!            reader / timer ─┘  └─▶ sync-core (state machine, codec, history)
//! ```
//!
//! Inputs from the reader, connect and timer tasks carry the epoch they
//! were started under; anything from an older epoch is ignored, which is
//! how a manual disconnect cancels in-flight work.
//!
//! # Example
//!
//! ```ignore
//! use clipsync_client::{SyncClient, WebSocketTransport};
//! use clipsync_types::Settings;
//!
//! let client = SyncClient::new(Settings::default(), WebSocketTransport::new());
//! let mut events = client.subscribe();
//! client.connect().await?;
//! client.wait_until_open().await?;
//! client.send_text("hello").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use clipsync_core::{
    decode_frame, encode, encode_control, is_echo, normalize_pairing_code, Action,
    ConnectionState, Decoded, Event, Frame, HistoryCache, PairingError, SyncEvent,
};
use clipsync_types::{
    now_millis, to_data_url, ControlMessage, DeviceId, HistoryItem, ItemKind, MessageKind,
    PairingCode, Settings, SyncError, SyncMessage,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::crypto::{
    CryptoError, Sealed, SecretKey, DECRYPTION_FAILED_PLACEHOLDER, ENCRYPTED_PLACEHOLDER,
};
use crate::store::{self, KeyValueStore, StoreError};
use crate::transport::{Transport, TransportError};

const INPUT_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 256;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Wire data or file error.
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pairing code rejected.
    #[error("{0}")]
    Pairing(#[from] PairingError),

    /// Text sends must not be empty.
    #[error("message is empty")]
    EmptyMessage,

    /// No history item with this id.
    #[error("no history item with id {0}")]
    UnknownItem(String),

    /// Only text items can be re-sent.
    #[error("history item {0} is a file and cannot be restored")]
    NotRestorable(String),

    /// Pairing sessions carry text only.
    #[error("files cannot be sent in a pairing session")]
    FilesNotSupported,

    /// The driver task has stopped.
    #[error("client has shut down")]
    ClientClosed,
}

/// Events emitted to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// An item from a peer was added to history.
    Received(HistoryItem),
    /// An item we sent was added to history.
    Sent(HistoryItem),
    /// A device joined the pairing session.
    PeerJoined(DeviceId),
    /// A device left the pairing session.
    PeerLeft(DeviceId),
    /// A connection attempt failed.
    ConnectionFailed(String),
    /// The transport closed.
    Disconnected(String),
    /// History was emptied.
    HistoryCleared,
}

/// Outcome of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// The history entry recorded for this send.
    pub item: HistoryItem,
    /// Whether the frame reached the transport. Sends while not open are
    /// recorded locally but never queued.
    pub delivered: bool,
}

/// The main sync client.
///
/// Must be created inside a Tokio runtime. Dropping the client stops its
/// driver task and closes the transport.
pub struct SyncClient {
    inputs: mpsc::Sender<Input>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<ClientEvent>,
    device_id: DeviceId,
    driver: Option<JoinHandle<()>>,
}

impl SyncClient {
    /// Create a client with in-memory state only.
    pub fn new<T: Transport>(settings: Settings, transport: T) -> Self {
        Self::spawn(settings, HistoryCache::new(), transport, None)
    }

    /// Create a client that persists settings and history to `store`.
    pub fn with_store<T: Transport>(
        settings: Settings,
        history: HistoryCache,
        transport: T,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::spawn(settings, history, transport, Some(store))
    }

    /// Create a client from the settings and history saved in `store`.
    pub async fn load<T: Transport>(
        transport: T,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let settings = store::load_settings(store.as_ref()).await?;
        let history = store::load_history(store.as_ref()).await?;
        Ok(Self::with_store(settings, history, transport, store))
    }

    fn spawn<T: Transport>(
        settings: Settings,
        history: HistoryCache,
        transport: T,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let (inputs_tx, inputs_rx) = mpsc::channel(INPUT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::new());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let device_id = DeviceId::random();

        let driver = Driver {
            transport: Arc::new(transport),
            settings,
            settings_key: None,
            device_id: device_id.clone(),
            state: ConnectionState::new(),
            state_tx,
            events: events_tx.clone(),
            history,
            store,
            session: None,
            epoch: 0,
            inputs: inputs_tx.clone(),
            connect_task: None,
            reader_task: None,
            timer_task: None,
        };
        let handle = tokio::spawn(driver.run(inputs_rx));

        Self {
            inputs: inputs_tx,
            state: state_rx,
            events: events_tx,
            device_id,
            driver: Some(handle),
        }
    }

    /// This device's pairing id.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Subscribe to client events. Events emitted before subscribing are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Wait until the session is `Open` or `Paired`.
    ///
    /// Never gives up on its own; wrap in a timeout.
    pub async fn wait_until_open(&self) -> Result<ConnectionState, ClientError> {
        let mut state = self.state.clone();
        let open = state
            .wait_for(|s| s.is_open())
            .await
            .map_err(|_| ClientError::ClientClosed)?;
        Ok(*open)
    }

    /// Connect to the relay from settings.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.command(Command::Connect {
            url: None,
            pairing: None,
        })
        .await
    }

    /// Connect to a specific relay URL.
    pub async fn connect_to(&self, url: &str) -> Result<(), ClientError> {
        self.command(Command::Connect {
            url: Some(url.to_string()),
            pairing: None,
        })
        .await
    }

    /// Join a pairing session.
    ///
    /// The session key is derived from `code`; `url` defaults to the relay
    /// from settings.
    pub async fn connect_paired(&self, code: &str, url: Option<&str>) -> Result<(), ClientError> {
        let code = normalize_pairing_code(code)?;
        self.command(Command::Connect {
            url: url.map(str::to_string),
            pairing: Some(code),
        })
        .await
    }

    /// Close the session, forget the pairing and clear history.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.command(Command::Disconnect).await
    }

    /// Send text to every peer.
    pub async fn send_text(&self, text: &str) -> Result<SendReport, ClientError> {
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        self.request(|reply| Command::Send {
            outgoing: Outgoing::text(text),
            reply,
        })
        .await?
    }

    /// Send a file (at most [`clipsync_types::MAX_FILE_SIZE`] bytes).
    pub async fn send_file(
        &self,
        file_name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<SendReport, ClientError> {
        let data_url = to_data_url(mime, bytes)?;
        self.request(|reply| Command::Send {
            outgoing: Outgoing {
                kind: ItemKind::File,
                content: data_url,
                file_name: Some(file_name.to_string()),
                file_type: Some(mime.to_string()),
            },
            reply,
        })
        .await?
    }

    /// Re-send a text history item as a new message.
    pub async fn restore(&self, id: &str) -> Result<SendReport, ClientError> {
        self.request(|reply| Command::Restore {
            id: id.to_string(),
            reply,
        })
        .await?
    }

    /// Newest-first snapshot of history.
    pub async fn history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        self.request(|reply| Command::History { reply }).await
    }

    /// Clear history once `confirm` agrees.
    ///
    /// `confirm` receives the number of items about to be removed. Returns
    /// how many were removed (0 when declined).
    pub async fn clear_history<F, Fut>(&self, confirm: F) -> Result<usize, ClientError>
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = bool>,
    {
        let pending = self.history().await?.len();
        if !confirm(pending).await {
            return Ok(0);
        }
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    /// Current settings.
    pub async fn settings(&self) -> Result<Settings, ClientError> {
        self.request(|reply| Command::Settings { reply }).await
    }

    /// Replace and persist settings.
    ///
    /// A new relay URL takes effect immediately when a session is active.
    pub async fn update_settings(&self, settings: Settings) -> Result<(), ClientError> {
        self.request(|reply| Command::UpdateSettings { settings, reply })
            .await?
    }

    /// Stop the driver and close the transport.
    pub async fn shutdown(mut self) {
        let _ = self.inputs.send(Input::Command(Command::Shutdown)).await;
        if let Some(handle) = self.driver.take() {
            let _ = handle.await;
        }
    }

    async fn command(&self, command: Command) -> Result<(), ClientError> {
        self.inputs
            .send(Input::Command(command))
            .await
            .map_err(|_| ClientError::ClientClosed)
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(make(reply)).await?;
        rx.await.map_err(|_| ClientError::ClientClosed)
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            // The driver holds its own sender, so a full queue would leave it running
            if self.inputs.try_send(Input::Command(Command::Shutdown)).is_err() {
                driver.abort();
            }
        }
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("device_id", &self.device_id)
            .field("state", &self.state())
            .finish()
    }
}

// ===========================================
// Driver
// ===========================================

struct Outgoing {
    kind: ItemKind,
    content: String,
    file_name: Option<String>,
    file_type: Option<String>,
}

impl Outgoing {
    fn text(text: &str) -> Self {
        Self {
            kind: ItemKind::Text,
            content: text.to_string(),
            file_name: None,
            file_type: None,
        }
    }
}

enum Command {
    Connect {
        url: Option<String>,
        pairing: Option<PairingCode>,
    },
    Disconnect,
    Send {
        outgoing: Outgoing,
        reply: oneshot::Sender<Result<SendReport, ClientError>>,
    },
    Restore {
        id: String,
        reply: oneshot::Sender<Result<SendReport, ClientError>>,
    },
    History {
        reply: oneshot::Sender<Vec<HistoryItem>>,
    },
    ClearHistory {
        reply: oneshot::Sender<usize>,
    },
    Settings {
        reply: oneshot::Sender<Settings>,
    },
    UpdateSettings {
        settings: Settings,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Shutdown,
}

enum ConnectFailure {
    Key(String),
    Transport(String),
}

enum Input {
    Command(Command),
    Connected {
        epoch: u64,
        result: Result<Option<SecretKey>, ConnectFailure>,
    },
    Frame {
        epoch: u64,
        frame: Frame,
    },
    Closed {
        epoch: u64,
        reason: String,
    },
    Timer {
        epoch: u64,
    },
}

/// Parameters of the current logical session.
struct Session {
    url: String,
    pairing: Option<PairingCode>,
    key: Option<SecretKey>,
}

struct Driver<T: Transport> {
    transport: Arc<T>,
    settings: Settings,
    settings_key: Option<SecretKey>,
    device_id: DeviceId,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ClientEvent>,
    history: HistoryCache,
    store: Option<Arc<dyn KeyValueStore>>,
    session: Option<Session>,
    epoch: u64,
    inputs: mpsc::Sender<Input>,
    connect_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
}

impl<T: Transport> Driver<T> {
    async fn run(mut self, mut inputs: mpsc::Receiver<Input>) {
        while let Some(input) = inputs.recv().await {
            match input {
                Input::Command(Command::Shutdown) => break,
                Input::Command(command) => self.on_command(command).await,
                Input::Connected { epoch, result } if epoch == self.epoch => {
                    self.on_connected(result).await
                }
                Input::Frame { epoch, frame } if epoch == self.epoch => self.on_frame(frame).await,
                Input::Closed { epoch, reason } if epoch == self.epoch => {
                    tracing::info!(%reason, "transport closed");
                    self.apply(Event::TransportClosed { reason }).await;
                }
                Input::Timer { epoch } if epoch == self.epoch => {
                    self.timer_task = None;
                    self.apply(Event::ReconnectTimer).await;
                }
                _ => tracing::trace!("ignoring input from a previous session"),
            }
        }

        self.stop_tasks();
        if let Some(timer) = self.timer_task.take() {
            timer.abort();
        }
        let _ = self.transport.close().await;
        tracing::debug!("client driver stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { url, pairing } => {
                let url = url.unwrap_or_else(|| self.settings.server_url.clone());
                tracing::info!(%url, pairing = pairing.is_some(), "connect requested");
                self.session = Some(Session {
                    url,
                    pairing,
                    key: None,
                });
                self.apply(Event::ConnectRequested).await;
            }
            Command::Disconnect => {
                tracing::info!("disconnect requested");
                self.apply(Event::DisconnectRequested).await;
            }
            Command::Send { outgoing, reply } => {
                let _ = reply.send(self.send(outgoing).await);
            }
            Command::Restore { id, reply } => {
                let result = match self.history.get(&id) {
                    None => Err(ClientError::UnknownItem(id)),
                    Some(item) if item.kind == ItemKind::File => {
                        Err(ClientError::NotRestorable(id))
                    }
                    Some(item) => {
                        let outgoing = Outgoing::text(&item.content);
                        self.send(outgoing).await
                    }
                };
                let _ = reply.send(result);
            }
            Command::History { reply } => {
                let _ = reply.send(self.history.to_vec());
            }
            Command::ClearHistory { reply } => {
                let removed = self.history.request_clear().confirm();
                self.persist_history().await;
                self.emit(ClientEvent::HistoryCleared);
                let _ = reply.send(removed);
            }
            Command::Settings { reply } => {
                let _ = reply.send(self.settings.clone());
            }
            Command::UpdateSettings { settings, reply } => {
                let _ = reply.send(self.update_settings(settings).await);
            }
            Command::Shutdown => {}
        }
    }

    async fn update_settings(&mut self, settings: Settings) -> Result<(), ClientError> {
        if let Some(store) = &self.store {
            store::save_settings(store.as_ref(), &settings).await?;
        }

        let url_changed = settings.server_url != self.settings.server_url;
        if settings.secret_key != self.settings.secret_key {
            self.settings_key = None;
        }
        self.settings = settings;

        if url_changed {
            if let Some(session) = self.session.as_mut() {
                session.url = self.settings.server_url.clone();
                tracing::info!(url = %session.url, "relay changed, reconnecting");
                self.apply(Event::ConnectRequested).await;
            }
        }
        Ok(())
    }

    /// Feed an event to the state machine and execute the resulting actions.
    async fn apply(&mut self, event: Event) {
        let previous = self.state;
        let (next, actions) = previous.on_event(event);
        self.state = next;
        if next != previous {
            tracing::info!(from = %previous, to = %next, "connection state changed");
            self.state_tx.send_replace(next);
            self.emit(ClientEvent::StateChanged(next));
        }

        for action in actions {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::Connect => self.start_connect(),
            Action::SendRegister => self.send_register().await,
            Action::CloseTransport => {
                self.stop_tasks();
                self.epoch += 1;
                if let Err(e) = self.transport.close().await {
                    tracing::debug!(error = %e, "close failed");
                }
            }
            Action::StartReconnectTimer { delay } => {
                if let Some(timer) = self.timer_task.take() {
                    timer.abort();
                }
                tracing::info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                let epoch = self.epoch;
                let inputs = self.inputs.clone();
                self.timer_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inputs.send(Input::Timer { epoch }).await;
                }));
            }
            Action::CancelReconnect => {
                if let Some(timer) = self.timer_task.take() {
                    timer.abort();
                }
            }
            Action::ClearSession => {
                self.session = None;
            }
            Action::ClearHistory => {
                self.history.clear();
                self.persist_history().await;
                self.emit(ClientEvent::HistoryCleared);
            }
            Action::EmitEvent(SyncEvent::ConnectionFailed { error }) => {
                tracing::warn!(%error, "connection attempt failed");
                self.emit(ClientEvent::ConnectionFailed(error));
            }
            Action::EmitEvent(SyncEvent::Disconnected { reason }) => {
                self.emit(ClientEvent::Disconnected(reason));
            }
        }
    }

    fn stop_tasks(&mut self) {
        if let Some(task) = self.connect_task.take() {
            task.abort();
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }

    /// Derive the pairing key if needed, then open the transport in the
    /// background. The outcome arrives as [`Input::Connected`].
    fn start_connect(&mut self) {
        let Some(session) = &self.session else {
            tracing::warn!("connect action without a session");
            return;
        };
        let url = session.url.clone();
        let code = match (&session.pairing, &session.key) {
            (Some(code), None) => Some(code.as_str().to_string()),
            _ => None,
        };

        self.stop_tasks();
        self.epoch += 1;
        let epoch = self.epoch;
        let transport = Arc::clone(&self.transport);
        let inputs = self.inputs.clone();

        self.connect_task = Some(tokio::spawn(async move {
            let key = match code {
                Some(code) => match derive_key(code).await {
                    Ok(key) => Some(key),
                    Err(e) => {
                        let result = Err(ConnectFailure::Key(e.to_string()));
                        let _ = inputs.send(Input::Connected { epoch, result }).await;
                        return;
                    }
                },
                None => None,
            };

            let result = transport
                .connect(&url)
                .await
                .map(|_| key)
                .map_err(|e| ConnectFailure::Transport(e.to_string()));
            let _ = inputs.send(Input::Connected { epoch, result }).await;
        }));
    }

    async fn on_connected(&mut self, result: Result<Option<SecretKey>, ConnectFailure>) {
        self.connect_task = None;
        match result {
            Ok(key) => {
                let pairing = match self.session.as_mut() {
                    Some(session) => {
                        if key.is_some() {
                            session.key = key;
                        }
                        session.pairing.is_some()
                    }
                    None => false,
                };
                self.spawn_reader();
                self.apply(Event::TransportOpened { pairing }).await;
            }
            Err(ConnectFailure::Key(error)) => {
                self.apply(Event::KeyDerivationFailed { error }).await;
            }
            Err(ConnectFailure::Transport(error)) => {
                self.apply(Event::ConnectFailed { error }).await;
            }
        }
    }

    fn spawn_reader(&mut self) {
        let epoch = self.epoch;
        let transport = Arc::clone(&self.transport);
        let inputs = self.inputs.clone();

        self.reader_task = Some(tokio::spawn(async move {
            loop {
                match transport.recv().await {
                    Ok(frame) => {
                        if inputs.send(Input::Frame { epoch, frame }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        let _ = inputs.send(Input::Closed { epoch, reason }).await;
                        break;
                    }
                }
            }
        }));
    }

    async fn send_register(&mut self) {
        let Some(code) = self.session.as_ref().and_then(|s| s.pairing.as_ref()) else {
            return;
        };
        let register = ControlMessage::Register {
            pairing_code: code.as_str().to_string(),
            id: self.device_id.as_str().to_string(),
        };
        match encode_control(&register) {
            Ok(frame) => {
                self.send_frame(frame).await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode REGISTER"),
        }
    }

    /// Best-effort transport send; failures surface later as a close.
    async fn send_frame(&self, frame: Frame) -> bool {
        match self.transport.send(frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                false
            }
        }
    }

    // ===========================================
    // Outbound
    // ===========================================

    async fn send(&mut self, outgoing: Outgoing) -> Result<SendReport, ClientError> {
        let pairing = self.session.as_ref().is_some_and(|s| s.pairing.is_some());
        let timestamp = now_millis();

        let delivered = if pairing {
            self.send_paired(&outgoing, timestamp).await?
        } else {
            self.send_simple(&outgoing, timestamp).await?
        };

        let item = HistoryItem::sent(
            outgoing.kind,
            outgoing.content,
            &self.settings.device_name,
            timestamp,
            outgoing.file_name,
        );
        self.push_history(item.clone()).await;
        self.emit(ClientEvent::Sent(item.clone()));
        Ok(SendReport { item, delivered })
    }

    async fn send_simple(
        &mut self,
        outgoing: &Outgoing,
        timestamp: u64,
    ) -> Result<bool, ClientError> {
        let (payload, iv) = match self.settings_key().await? {
            Some(key) => {
                let sealed = seal(key, outgoing.content.clone()).await?;
                (sealed.payload, Some(sealed.iv))
            }
            None => (outgoing.content.clone(), None),
        };

        let message = SyncMessage {
            kind: match outgoing.kind {
                ItemKind::Text => MessageKind::Text,
                ItemKind::File => MessageKind::File,
            },
            payload,
            iv,
            sender: Some(self.settings.device_name.clone()),
            timestamp,
            file_name: outgoing.file_name.clone(),
            file_type: outgoing.file_type.clone(),
        };

        if !self.state.is_open() {
            tracing::debug!(state = %self.state, "not open, message not sent");
            return Ok(false);
        }
        Ok(self.send_frame(encode(&message)?).await)
    }

    async fn send_paired(
        &mut self,
        outgoing: &Outgoing,
        timestamp: u64,
    ) -> Result<bool, ClientError> {
        if outgoing.kind == ItemKind::File {
            return Err(ClientError::FilesNotSupported);
        }
        let key = self.session.as_ref().and_then(|s| s.key.clone());
        let Some(key) = key.filter(|_| self.state == ConnectionState::Paired) else {
            tracing::debug!(state = %self.state, "not paired, message not sent");
            return Ok(false);
        };

        let sealed = seal(key, outgoing.content.clone()).await?;
        let update = ControlMessage::ClipboardUpdate {
            payload: sealed.payload,
            iv: sealed.iv,
            timestamp: Some(timestamp),
            sender_id: Some(self.device_id.as_str().to_string()),
        };
        Ok(self.send_frame(encode_control(&update)?).await)
    }

    /// Key derived from the settings secret, cached until the secret changes.
    async fn settings_key(&mut self) -> Result<Option<SecretKey>, CryptoError> {
        if !self.settings.encryption_enabled() {
            return Ok(None);
        }
        if self.settings_key.is_none() {
            self.settings_key = Some(derive_key(self.settings.secret_key.clone()).await?);
        }
        Ok(self.settings_key.clone())
    }

    // ===========================================
    // Inbound
    // ===========================================

    async fn on_frame(&mut self, frame: Frame) {
        match decode_frame(frame) {
            Decoded::Control(control) => self.on_control(control).await,
            Decoded::Drop(e) => tracing::warn!(error = %e, "dropping frame"),
            decoded => {
                if let Some(message) = decoded.into_message(now_millis()) {
                    self.on_message(message).await;
                }
            }
        }
    }

    async fn on_control(&mut self, control: ControlMessage) {
        match control {
            ControlMessage::RegisterAck => self.apply(Event::RegisterAcked).await,
            ControlMessage::DeviceJoined { device_id } => {
                tracing::info!(%device_id, "device joined");
                self.emit(ClientEvent::PeerJoined(DeviceId::from_string(device_id)));
            }
            ControlMessage::DeviceLeft { device_id } => {
                tracing::info!(%device_id, "device left");
                self.emit(ClientEvent::PeerLeft(DeviceId::from_string(device_id)));
            }
            ControlMessage::ClipboardUpdate {
                payload,
                iv,
                timestamp,
                sender_id,
            } => {
                let message = SyncMessage {
                    kind: MessageKind::Text,
                    payload,
                    iv: Some(iv),
                    sender: Some(sender_id.unwrap_or_else(|| "unknown".to_string())),
                    timestamp: timestamp.unwrap_or_else(now_millis),
                    file_name: None,
                    file_type: None,
                };
                self.on_message(message).await;
            }
            ControlMessage::Register { id, .. } => {
                tracing::debug!(%id, "ignoring REGISTER from a peer");
            }
        }
    }

    async fn on_message(&mut self, message: SyncMessage) {
        if is_echo(&message, &self.settings.device_name)
            || is_echo(&message, self.device_id.as_str())
        {
            tracing::debug!("dropping echo of our own message");
            return;
        }

        match message.kind {
            MessageKind::Ping => {
                let mut pong =
                    SyncMessage::text(message.payload.clone(), &self.settings.device_name);
                pong.kind = MessageKind::Pong;
                if let Ok(frame) = encode(&pong) {
                    self.send_frame(frame).await;
                }
                return;
            }
            MessageKind::Pong => return,
            _ => {}
        }

        let content = match message.iv.as_deref() {
            None => message.payload.clone(),
            Some(iv) => match self.receive_key().await {
                None => ENCRYPTED_PLACEHOLDER.to_string(),
                Some(key) => match open(key, message.payload.clone(), iv.to_string()).await {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            sender = message.sender_or_unknown(),
                            "could not decrypt message"
                        );
                        DECRYPTION_FAILED_PLACEHOLDER.to_string()
                    }
                },
            },
        };

        let item = HistoryItem::received(&message, content);
        tracing::debug!(?item, "received item");
        self.push_history(item.clone()).await;
        self.emit(ClientEvent::Received(item));
    }

    /// Pairing key when paired, otherwise the settings key.
    async fn receive_key(&mut self) -> Option<SecretKey> {
        if let Some(key) = self.session.as_ref().and_then(|s| s.key.clone()) {
            return Some(key);
        }
        match self.settings_key().await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "settings key unavailable");
                None
            }
        }
    }

    // ===========================================
    // History and events
    // ===========================================

    async fn push_history(&mut self, item: HistoryItem) {
        self.history.push(item);
        self.persist_history().await;
    }

    async fn persist_history(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store::save_history(store.as_ref(), &self.history).await {
                tracing::warn!(error = %e, "failed to persist history");
            }
        }
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

async fn derive_key(secret: String) -> Result<SecretKey, CryptoError> {
    tokio::task::spawn_blocking(move || SecretKey::derive(&secret))
        .await
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?
}

async fn seal(key: SecretKey, plaintext: String) -> Result<Sealed, CryptoError> {
    tokio::task::spawn_blocking(move || key.encrypt(&plaintext))
        .await
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
}

async fn open(key: SecretKey, payload: String, iv: String) -> Result<String, CryptoError> {
    tokio::task::spawn_blocking(move || key.decrypt(&payload, &iv))
        .await
        .map_err(|_| CryptoError::DecryptionFailed)?
}
