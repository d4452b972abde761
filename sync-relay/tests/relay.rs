//! Relay tests over real WebSocket connections.

use clipsync_relay::{Config, Relay};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestRelay {
    addr: SocketAddr,
    relay: Arc<Relay>,
    _shutdown: oneshot::Sender<()>,
}

impl TestRelay {
    async fn start(config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = Arc::new(Relay::new(config));
        let (tx, rx) = oneshot::channel::<()>();
        let served = Arc::clone(&relay);
        tokio::spawn(async move {
            clipsync_relay::serve(listener, served, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });
        Self {
            addr,
            relay,
            _shutdown: tx,
        }
    }

    /// Connect and wait until the relay has registered the peer.
    async fn connect(&self, path: &str) -> Ws {
        let before = self.relay.total_peers();
        let (ws, _) = connect_async(format!("ws://{}{}", self.addr, path))
            .await
            .unwrap();
        self.wait_for_peers(before + 1).await;
        ws
    }

    async fn wait_for_peers(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.relay.total_peers() != n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("peer count not reached");
    }
}

async fn next_text(ws: &mut Ws) -> String {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(ws: &mut Ws) {
    let got = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(got.is_err(), "expected no frame, got {got:?}");
}

#[tokio::test]
async fn text_is_forwarded_to_other_peers_only() {
    let relay = TestRelay::start(Config::default()).await;
    let mut a = relay.connect("/").await;
    let mut b = relay.connect("/ws").await;
    let mut c = relay.connect("/").await;

    let frame = r#"{"type":"text","payload":"hi","sender":"A","timestamp":1}"#;
    a.send(Message::Text(frame.into())).await.unwrap();

    assert_eq!(next_text(&mut b).await, frame);
    assert_eq!(next_text(&mut c).await, frame);
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn binary_is_resent_as_text() {
    let relay = TestRelay::start(Config::default()).await;
    let mut a = relay.connect("/").await;
    let mut b = relay.connect("/").await;

    a.send(Message::Binary(b"raw bytes".to_vec())).await.unwrap();
    assert_eq!(next_text(&mut b).await, "raw bytes");
}

#[tokio::test]
async fn pairing_rooms_ack_announce_and_isolate() {
    let relay = TestRelay::start(Config::default()).await;
    let mut a = relay.connect("/").await;
    let mut b = relay.connect("/").await;
    let mut plain = relay.connect("/").await;

    a.send(Message::Text(
        r#"{"type":"REGISTER","pairingCode":"BLUE-42","id":"aaaa0001"}"#.into(),
    ))
    .await
    .unwrap();
    assert_eq!(next_text(&mut a).await, r#"{"type":"REGISTER_ACK"}"#);

    b.send(Message::Text(
        r#"{"type":"REGISTER","pairingCode":"BLUE-42","id":"bbbb0002"}"#.into(),
    ))
    .await
    .unwrap();
    assert_eq!(next_text(&mut b).await, r#"{"type":"REGISTER_ACK"}"#);
    assert_eq!(
        next_text(&mut a).await,
        r#"{"type":"DEVICE_JOINED","deviceId":"bbbb0002"}"#
    );

    let update = r#"{"type":"CLIPBOARD_UPDATE","payload":"cA==","iv":"aXY="}"#;
    a.send(Message::Text(update.into())).await.unwrap();
    assert_eq!(next_text(&mut b).await, update);
    assert_silent(&mut plain).await;

    b.close(None).await.unwrap();
    assert_eq!(
        next_text(&mut a).await,
        r#"{"type":"DEVICE_LEFT","deviceId":"bbbb0002"}"#
    );
}

#[tokio::test]
async fn connection_limit_refuses_extra_peers() {
    let mut config = Config::default();
    config.limits.max_connections = 1;
    let relay = TestRelay::start(config).await;
    let _a = relay.connect("/").await;

    let refused = connect_async(format!("ws://{}/", relay.addr)).await;
    assert!(refused.is_err());
    assert_eq!(relay.relay.total_peers(), 1);
}

#[tokio::test]
async fn disconnect_frees_the_slot() {
    let relay = TestRelay::start(Config::default()).await;
    let mut a = relay.connect("/").await;
    let _b = relay.connect("/").await;

    a.close(None).await.unwrap();
    relay.wait_for_peers(1).await;
}
