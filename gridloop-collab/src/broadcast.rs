//! Fan-out of raw message text to N-1 connected channels.
//!
//! The hub never decodes envelopes — frames are forwarded verbatim,
//! tagged with the originating connection id so each connection's
//! writer can skip its own frames. Built on tokio broadcast channels:
//! every connection gets an independent receiver buffering up to
//! `capacity` frames before it starts lagging.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// A raw frame: originating connection plus the untouched message text.
pub type Frame = (Uuid, Arc<String>);

/// Counters for monitoring hub health.
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    /// Frames that reached at least one receiver.
    pub frames_forwarded: u64,
    /// Frames sent while no receiver was subscribed.
    pub frames_dropped: u64,
    pub active_clients: usize,
}

/// Fan-out hub for one room.
pub struct BroadcastHub {
    sender: broadcast::Sender<Frame>,
    clients: Arc<RwLock<HashSet<Uuid>>>,
    capacity: usize,
    frames_forwarded: AtomicU64,
    frames_dropped: AtomicU64,
}

impl BroadcastHub {
    /// `capacity` bounds how many frames a slow connection may buffer
    /// before it starts dropping (backpressure).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            clients: Arc::new(RwLock::new(HashSet::new())),
            capacity,
            frames_forwarded: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Register a connection and get its receiver.
    pub async fn add_client(&self, conn_id: Uuid) -> broadcast::Receiver<Frame> {
        self.clients.write().await.insert(conn_id);
        self.sender.subscribe()
    }

    /// Drop a connection from the registry.
    pub async fn remove_client(&self, conn_id: &Uuid) -> bool {
        self.clients.write().await.remove(conn_id)
    }

    /// Forward a frame to every receiver. Receivers see the origin id
    /// and skip frames they produced themselves. Lock-free; returns the
    /// number of receivers the frame reached.
    ///
    /// A frame with no receiver to reach counts as dropped, not
    /// forwarded.
    pub fn forward(&self, origin: Uuid, text: Arc<String>) -> usize {
        let count = self.sender.send((origin, text)).unwrap_or(0);
        if count > 0 {
            self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
        count
    }

    /// Subscribe without registering a client (monitoring taps).
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.sender.subscribe()
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn has_client(&self, conn_id: &Uuid) -> bool {
        self.clients.read().await.contains(conn_id)
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            active_clients: self.clients.read().await.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Name of the room every connection currently lands in.
pub const DEFAULT_ROOM: &str = "main";

/// Room registry: maps room names to hubs.
///
/// The relay routes everything through [`DEFAULT_ROOM`] today; per-room
/// client membership is a stub collaborator for a future join protocol.
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Arc<BroadcastHub>>>>,
    default_capacity: usize,
}

impl RoomRegistry {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            default_capacity,
        }
    }

    /// Get or create the hub for a room.
    pub async fn get_or_create(&self, name: &str) -> Arc<BroadcastHub> {
        // Fast path: read lock
        {
            let rooms = self.rooms.read().await;
            if let Some(hub) = rooms.get(name) {
                return hub.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        // Double-check after acquiring write lock
        if let Some(hub) = rooms.get(name) {
            return hub.clone();
        }

        let hub = Arc::new(BroadcastHub::new(self.default_capacity));
        rooms.insert(name.to_string(), hub.clone());
        hub
    }

    /// Remove a room once its last client is gone.
    pub async fn remove_if_empty(&self, name: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        if let Some(hub) = rooms.get(name) {
            if hub.client_count().await == 0 {
                rooms.remove(name);
                return true;
            }
        }
        false
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn active_rooms(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_remove_client() {
        let hub = BroadcastHub::new(16);
        let conn = Uuid::new_v4();

        let _rx = hub.add_client(conn).await;
        assert_eq!(hub.client_count().await, 1);
        assert!(hub.has_client(&conn).await);

        assert!(hub.remove_client(&conn).await);
        assert_eq!(hub.client_count().await, 0);
        assert!(!hub.remove_client(&conn).await);
    }

    #[tokio::test]
    async fn test_forward_reaches_every_receiver() {
        let hub = BroadcastHub::new(16);

        let sender_conn = Uuid::new_v4();
        let mut rx1 = hub.add_client(sender_conn).await;
        let mut rx2 = hub.add_client(Uuid::new_v4()).await;

        let text = Arc::new(r#"{"type":"request","id":"p1"}"#.to_string());
        let count = hub.forward(sender_conn, text.clone());
        // Fan-out includes the sender's receiver — filtering by origin
        // is the connection writer's job.
        assert_eq!(count, 2);

        let (origin, payload) = rx1.recv().await.unwrap();
        assert_eq!(origin, sender_conn);
        assert_eq!(*payload, *text);
        let _ = rx2.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_frames_are_forwarded_verbatim() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.add_client(Uuid::new_v4()).await;

        // The hub must not care that this is not a valid envelope.
        let garbage = Arc::new("not an envelope at all".to_string());
        hub.forward(Uuid::new_v4(), garbage.clone());

        let (_, payload) = rx.recv().await.unwrap();
        assert_eq!(*payload, *garbage);
    }

    #[tokio::test]
    async fn test_stats_count_forwards() {
        let hub = BroadcastHub::new(16);
        let _rx = hub.add_client(Uuid::new_v4()).await;

        hub.forward(Uuid::new_v4(), Arc::new("a".into()));
        hub.forward(Uuid::new_v4(), Arc::new("b".into()));

        let stats = hub.stats().await;
        assert_eq!(stats.frames_forwarded, 2);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(stats.active_clients, 1);
    }

    #[tokio::test]
    async fn test_forward_without_receivers_counts_as_dropped() {
        let hub = BroadcastHub::new(16);

        // No receiver subscribed yet.
        assert_eq!(hub.forward(Uuid::new_v4(), Arc::new("lost".into())), 0);

        let _rx = hub.add_client(Uuid::new_v4()).await;
        assert_eq!(hub.forward(Uuid::new_v4(), Arc::new("seen".into())), 1);

        let stats = hub.stats().await;
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.frames_forwarded, 1);
    }

    #[tokio::test]
    async fn test_room_registry_get_or_create() {
        let registry = RoomRegistry::new(16);

        let hub1 = registry.get_or_create(DEFAULT_ROOM).await;
        let hub2 = registry.get_or_create(DEFAULT_ROOM).await;
        assert!(Arc::ptr_eq(&hub1, &hub2));
        assert_eq!(registry.room_count().await, 1);

        let _other = registry.get_or_create("studio-b").await;
        assert_eq!(registry.room_count().await, 2);
        assert!(registry.active_rooms().await.contains(&"studio-b".to_string()));
    }

    #[tokio::test]
    async fn test_room_registry_cleanup() {
        let registry = RoomRegistry::new(16);
        let hub = registry.get_or_create(DEFAULT_ROOM).await;
        let conn = Uuid::new_v4();
        let _rx = hub.add_client(conn).await;

        assert!(!registry.remove_if_empty(DEFAULT_ROOM).await);

        hub.remove_client(&conn).await;
        assert!(registry.remove_if_empty(DEFAULT_ROOM).await);
        assert_eq!(registry.room_count().await, 0);
    }
}
