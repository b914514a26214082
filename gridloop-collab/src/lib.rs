//! # gridloop-collab — Sync transport for the collaborative sequencer
//!
//! Moves full document snapshots between peers through a stateless
//! relay. Convergence lives entirely in `gridloop-core`; this crate
//! only carries bytes and applies the request/update handshake.
//!
//! ```text
//! ┌────────────┐    WebSocket     ┌─────────────┐
//! │ SyncClient │ ◄──────────────► │ RelayServer │
//! │ (per peer) │    JSON frames   │ (stateless) │
//! └─────┬──────┘                  └──────┬──────┘
//!       │                                │
//!       ▼                         ┌──────┴──────┐
//! ┌────────────┐                  │ BroadcastHub│
//! │  Document  │                  │  (fan-out)  │
//! │  (local)   │                  └─────────────┘
//! └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] — JSON wire envelopes (`request` / `update`)
//! - [`broadcast`] — verbatim frame fan-out with per-connection receivers
//! - [`relay`] — the stateless relay server
//! - [`client`] — document-aware sync client

pub mod broadcast;
pub mod client;
pub mod protocol;
pub mod relay;

pub use broadcast::{BroadcastHub, HubStats, RoomRegistry, DEFAULT_ROOM};
pub use client::{generate_peer_id, ConnectionState, SyncClient, SyncEvent};
pub use protocol::{ProtocolError, SyncMessage};
pub use relay::{RelayConfig, RelayServer, RelayStats};
