//! Stateless WebSocket relay.
//!
//! ```text
//! Client A ──┐
//!             ├── RelayServer ── BroadcastHub ──┬── Client B
//! Client B ──┘    (no Document,                 └── Client C
//!                  no history)
//! ```
//!
//! The relay holds no document and no per-client history. Every inbound
//! text frame is forwarded verbatim to every other currently connected
//! channel; message semantics are never inspected. There is no delivery
//! guarantee and no ordering guarantee across connections — a dropped
//! connection simply stops receiving, and reconnection is the client's
//! responsibility.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::broadcast::{BroadcastHub, RoomRegistry, DEFAULT_ROOM};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Frames buffered per connection before a laggard starts dropping.
    pub broadcast_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            broadcast_capacity: 256,
        }
    }
}

/// Relay statistics.
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub frames_forwarded: u64,
    pub total_bytes: u64,
}

/// The fan-out relay process.
pub struct RelayServer {
    config: RelayConfig,
    rooms: Arc<RoomRegistry>,
    stats: Arc<RwLock<RelayStats>>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let rooms = Arc::new(RoomRegistry::new(config.broadcast_capacity));
        Self {
            config,
            rooms,
            stats: Arc::new(RwLock::new(RelayStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RelayConfig::default())
    }

    /// Accept connections forever. Call from an async runtime.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("Relay listening on {}", self.config.bind_addr);

        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let hub = self.rooms.get_or_create(DEFAULT_ROOM).await;
            let stats = self.stats.clone();

            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, hub, stats).await {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle one WebSocket connection until it closes.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        hub: Arc<BroadcastHub>,
        stats: Arc<RwLock<RelayStats>>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let conn_id = Uuid::new_v4();
        let mut hub_rx = hub.add_client(conn_id).await;
        log::info!("Client connected from {addr} (conn {conn_id})");

        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        loop {
            tokio::select! {
                // Inbound frame: forward verbatim, never decode.
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            {
                                let mut s = stats.write().await;
                                s.frames_forwarded += 1;
                                s.total_bytes += text.len() as u64;
                            }
                            let receivers = hub.forward(conn_id, Arc::new(text.to_string()));
                            log::trace!("Forwarded {} bytes from {conn_id} to {receivers} receivers", text.len());
                        }

                        Some(Ok(Message::Ping(data))) => {
                            // A failed pong means the channel is gone; fall
                            // through to cleanup like every other exit path.
                            if ws_sender.send(Message::Pong(data)).await.is_err() {
                                log::info!("Pong to {addr} failed, closing");
                                break;
                            }
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            log::info!("Connection closed from {addr}");
                            break;
                        }

                        Some(Err(e)) => {
                            log::error!("WebSocket error from {addr}: {e}");
                            break;
                        }

                        _ => {}
                    }
                }

                // Outbound frame from some other connection.
                frame = hub_rx.recv() => {
                    match frame {
                        Ok((origin, text)) => {
                            if origin == conn_id {
                                continue; // Skip our own frames
                            }
                            // Best-effort delivery: a failed send means the
                            // channel is gone, stop forwarding to it.
                            if ws_sender.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("Connection {conn_id} lagged by {n} frames");
                        }
                        Err(_) => break,
                    }
                }
            }
        }

        hub.remove_client(&conn_id).await;
        {
            let mut s = stats.write().await;
            s.active_connections -= 1;
        }
        log::info!("Client {conn_id} removed");

        Ok(())
    }

    pub async fn stats(&self) -> RelayStats {
        self.stats.read().await.clone()
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }
}
