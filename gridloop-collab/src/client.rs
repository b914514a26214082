//! WebSocket sync client: glue between a local [`Document`] and the
//! relay.
//!
//! On connect the client announces itself with a `request` envelope.
//! Any incoming `request` from another peer is answered with an
//! `update` carrying our full document state; any incoming `update`
//! from another peer is merged into the document. Envelopes carrying
//! our own id (echoed through the relay) are ignored by comparison,
//! and malformed frames are logged and dropped.
//!
//! The document is dependency-injected and shared with the rest of the
//! application; the client never constructs its own.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use gridloop_core::Document;

use crate::protocol::{ProtocolError, SyncMessage};

/// Generate a fresh peer id for a client session.
pub fn generate_peer_id() -> String {
    Uuid::new_v4().to_string()
}

/// Client connection state. There is no automatic reconnection; once
/// disconnected the client stays disconnected until told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events emitted for the application (UI refresh, diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connection established and presence announced.
    Connected,
    /// Connection lost.
    Disconnected,
    /// A remote peer asked for our state; we replied with an update.
    StateRequested { peer: String },
    /// A remote snapshot was merged. `changed` is false when the
    /// snapshot carried nothing new.
    RemoteMerged { peer: String, changed: bool },
}

/// The sync client for one session.
pub struct SyncClient {
    peer_id: String,
    document: Arc<Mutex<Document>>,
    state: Arc<RwLock<ConnectionState>>,
    outgoing_tx: Option<mpsc::Sender<String>>,
    event_rx: Option<mpsc::Receiver<SyncEvent>>,
    event_tx: mpsc::Sender<SyncEvent>,
    server_url: String,
}

impl SyncClient {
    /// Create a client around an existing document.
    ///
    /// `peer_id` should match the document's owning peer id.
    pub fn new(
        peer_id: impl Into<String>,
        document: Arc<Mutex<Document>>,
        server_url: impl Into<String>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            peer_id: peer_id.into(),
            document,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            outgoing_tx: None,
            event_rx: Some(event_rx),
            event_tx,
            server_url: server_url.into(),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Connect to the relay and announce presence.
    ///
    /// Spawns background tasks for reading and writing frames.
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        *self.state.write().await = ConnectionState::Connecting;

        let ws_stream = match tokio_tungstenite::connect_async(&self.server_url).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                log::warn!("Failed to connect to {}: {e}", self.server_url);
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ProtocolError::ConnectionClosed);
            }
        };

        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward the outgoing channel to the WebSocket.
        let (out_tx, mut out_rx) = mpsc::channel::<String>(256);
        self.outgoing_tx = Some(out_tx.clone());
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if ws_writer
                    .send(tokio_tungstenite::tungstenite::Message::Text(text.into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        // Announce presence; peers will answer with their state.
        let request = SyncMessage::request(self.peer_id.clone()).encode()?;
        out_tx
            .send(request)
            .await
            .map_err(|_| ProtocolError::ConnectionClosed)?;

        *self.state.write().await = ConnectionState::Connected;
        let _ = self.event_tx.send(SyncEvent::Connected).await;

        // Reader task: apply the sync protocol to incoming frames.
        let document = self.document.clone();
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        let peer_id = self.peer_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(tokio_tungstenite::tungstenite::Message::Text(text)) => {
                        let decoded = match SyncMessage::decode(text.as_str()) {
                            Ok(decoded) => decoded,
                            Err(e) => {
                                log::warn!("Dropping malformed envelope: {e}");
                                continue;
                            }
                        };

                        // Our own envelopes come back through the relay.
                        if decoded.peer_id() == peer_id {
                            continue;
                        }

                        match decoded {
                            SyncMessage::Request { id } => {
                                let snapshot = document.lock().await.state();
                                let reply = SyncMessage::update(peer_id.clone(), snapshot);
                                match reply.encode() {
                                    Ok(encoded) => {
                                        let _ = out_tx.send(encoded).await;
                                    }
                                    Err(e) => {
                                        log::error!("Failed to encode state update: {e}");
                                    }
                                }
                                let _ = event_tx.send(SyncEvent::StateRequested { peer: id }).await;
                            }
                            SyncMessage::Update { id, data } => {
                                let changed = document.lock().await.merge(data);
                                log::debug!("Merged update from {id} (changed: {changed})");
                                let _ = event_tx
                                    .send(SyncEvent::RemoteMerged { peer: id, changed })
                                    .await;
                            }
                        }
                    }
                    Ok(tokio_tungstenite::tungstenite::Message::Close(_)) | Err(_) => {
                        break;
                    }
                    _ => {}
                }
            }

            *state.write().await = ConnectionState::Disconnected;
            let _ = event_tx.send(SyncEvent::Disconnected).await;
        });

        Ok(())
    }

    /// Broadcast our full document state in an `update` envelope.
    ///
    /// Call after local mutations. Delivery is best effort: when the
    /// connection is down the call is a logged no-op, never an error.
    pub async fn publish(&self) -> Result<(), ProtocolError> {
        if *self.state.read().await != ConnectionState::Connected {
            log::debug!("Not connected, skipping publish");
            return Ok(());
        }

        let snapshot = self.document.lock().await.state();
        let encoded = SyncMessage::update(self.peer_id.clone(), snapshot).encode()?;

        if let Some(ref tx) = self.outgoing_tx {
            if tx.send(encoded).await.is_err() {
                log::warn!("Channel closed while publishing, dropping update");
            }
        }
        Ok(())
    }

    /// The shared document this client syncs.
    pub fn document(&self) -> Arc<Mutex<Document>> {
        self.document.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(url: &str) -> SyncClient {
        let peer_id = generate_peer_id();
        let document = Arc::new(Mutex::new(Document::new(peer_id.clone())));
        SyncClient::new(peer_id, document, url)
    }

    #[test]
    fn test_client_creation() {
        let client = test_client("ws://localhost:8080");
        assert_eq!(client.server_url(), "ws://localhost:8080");
        assert!(!client.peer_id().is_empty());
    }

    #[tokio::test]
    async fn test_client_initial_state() {
        let client = test_client("ws://localhost:8080");
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_is_noop() {
        let client = test_client("ws://localhost:8080");
        client.document().lock().await.set_bpm(140.0);
        // Best-effort: no error, nothing sent.
        client.publish().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_relay_fails_cleanly() {
        let mut client = test_client("ws://127.0.0.1:1");
        assert!(client.connect().await.is_err());
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_take_event_rx() {
        let mut client = test_client("ws://localhost:8080");
        assert!(client.take_event_rx().is_some());
        assert!(client.take_event_rx().is_none());
    }

    #[test]
    fn test_generated_peer_ids_are_unique() {
        assert_ne!(generate_peer_id(), generate_peer_id());
    }
}
