//! Clients talking through a real relay over WebSockets.

use clipsync_client::{
    ClientEvent, SyncClient, WebSocketTransport, DECRYPTION_FAILED_PLACEHOLDER,
    ENCRYPTED_PLACEHOLDER,
};
use clipsync_relay::{Config, Relay};
use clipsync_types::{HistoryItem, Settings};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};

const WAIT: Duration = Duration::from_secs(10);

async fn start_relay() -> (String, Arc<Relay>, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let relay = Arc::new(Relay::new(Config::default()));
    let (tx, rx) = oneshot::channel::<()>();
    let served = Arc::clone(&relay);
    tokio::spawn(async move {
        let _ = clipsync_relay::serve(listener, served, async {
            let _ = rx.await;
        })
        .await;
    });
    (url, relay, tx)
}

async fn client(url: &str, name: &str, secret: &str) -> SyncClient {
    let settings = Settings::default()
        .with_server_url(url)
        .with_device_name(name)
        .with_secret_key(secret);
    let client = SyncClient::new(settings, WebSocketTransport::new());
    client.connect().await.unwrap();
    tokio::time::timeout(WAIT, client.wait_until_open())
        .await
        .expect("client did not connect")
        .unwrap();
    client
}

async fn wait_for_peers(relay: &Relay, n: usize) {
    tokio::time::timeout(WAIT, async {
        while relay.total_peers() != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("relay did not see all peers");
}

async fn next_received(events: &mut broadcast::Receiver<ClientEvent>) -> HistoryItem {
    tokio::time::timeout(WAIT, async {
        loop {
            if let ClientEvent::Received(item) = events.recv().await.unwrap() {
                return item;
            }
        }
    })
    .await
    .expect("nothing received")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn encrypted_text_reaches_peers_with_matching_secret() {
    let (url, relay, _shutdown) = start_relay().await;

    let a = client(&url, "A", "x").await;
    let b = client(&url, "B", "x").await;
    let c_wrong = client(&url, "C", "y").await;
    let d_none = client(&url, "D", "").await;
    wait_for_peers(&relay, 4).await;

    let mut b_events = b.subscribe();
    let mut c_events = c_wrong.subscribe();
    let mut d_events = d_none.subscribe();

    let report = a.send_text("hi").await.unwrap();
    assert!(report.delivered);

    let at_b = next_received(&mut b_events).await;
    assert_eq!(at_b.content, "hi");
    assert_eq!(at_b.sender, "A");

    assert_eq!(
        next_received(&mut c_events).await.content,
        DECRYPTION_FAILED_PLACEHOLDER
    );
    assert_eq!(next_received(&mut d_events).await.content, ENCRYPTED_PLACEHOLDER);

    // Sender never sees its own message
    let a_history = a.history().await.unwrap();
    assert_eq!(a_history.len(), 1);
    assert!(a_history[0].is_self);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn plaintext_and_files_cross_the_relay() {
    let (url, relay, _shutdown) = start_relay().await;

    let a = client(&url, "A", "").await;
    let b = client(&url, "B", "").await;
    wait_for_peers(&relay, 2).await;
    let mut b_events = b.subscribe();

    a.send_text("plain hello").await.unwrap();
    assert_eq!(next_received(&mut b_events).await.content, "plain hello");

    a.send_file("note.txt", "text/plain", b"file body").await.unwrap();
    let file = next_received(&mut b_events).await;
    assert_eq!(file.file_name.as_deref(), Some("note.txt"));
    let parsed = clipsync_types::parse_data_url(&file.content).unwrap();
    assert_eq!(parsed.bytes, b"file body");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pairing_session_through_relay() {
    let (url, relay, _shutdown) = start_relay().await;

    let a = SyncClient::new(Settings::default().with_server_url(&url), WebSocketTransport::new());
    let b = SyncClient::new(Settings::default().with_server_url(&url), WebSocketTransport::new());
    a.connect_paired("GREEN-7", None).await.unwrap();
    tokio::time::timeout(WAIT, a.wait_until_open()).await.unwrap().unwrap();

    let mut a_events = a.subscribe();
    b.connect_paired("GREEN-7", None).await.unwrap();
    tokio::time::timeout(WAIT, b.wait_until_open()).await.unwrap().unwrap();
    assert_eq!(relay.room_size("GREEN-7"), 2);

    let joined = tokio::time::timeout(WAIT, async {
        loop {
            if let ClientEvent::PeerJoined(id) = a_events.recv().await.unwrap() {
                return id;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(&joined, b.device_id());

    let mut b_events = b.subscribe();
    a.send_text("paired secret").await.unwrap();
    let item = next_received(&mut b_events).await;
    assert_eq!(item.content, "paired secret");
    assert_eq!(item.sender, a.device_id().as_str());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn largest_encrypted_file_crosses_default_relay() {
    let (url, relay, _shutdown) = start_relay().await;

    let a = client(&url, "A", "x").await;
    let b = client(&url, "B", "x").await;
    wait_for_peers(&relay, 2).await;
    let mut b_events = b.subscribe();

    let body = vec![0x41; clipsync_types::MAX_FILE_SIZE];
    let report = a
        .send_file("big.bin", "application/octet-stream", &body)
        .await
        .unwrap();
    assert!(report.delivered);

    // Decrypting several MiB is slow in debug builds
    let file = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            if let ClientEvent::Received(item) = b_events.recv().await.unwrap() {
                return item;
            }
        }
    })
    .await
    .expect("file never arrived");

    assert_eq!(file.file_name.as_deref(), Some("big.bin"));
    let parsed = clipsync_types::parse_data_url(&file.content).unwrap();
    assert_eq!(parsed.bytes.len(), body.len());
    assert!(parsed.bytes == body);
    assert_eq!(a.state(), clipsync_core::ConnectionState::Open);
}
