//! Textual wire protocol for document synchronization.
//!
//! Two envelope kinds travel over the relay, JSON-encoded:
//! ```text
//! {"type":"request","id":"<peer>"}
//! {"type":"update","id":"<peer>","data":{...document state...}}
//! ```
//! A `request` announces presence and asks peers for their state; an
//! `update` carries a full document snapshot. Peers filter echoes of
//! their own messages by `id` — the relay forwards everything verbatim.

use serde::{Deserialize, Serialize};

use gridloop_core::DocumentState;

/// A sync envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncMessage {
    /// Announce presence; peers respond with their current state.
    Request { id: String },
    /// Full document snapshot from the named peer.
    Update { id: String, data: DocumentState },
}

impl SyncMessage {
    pub fn request(id: impl Into<String>) -> Self {
        Self::Request { id: id.into() }
    }

    pub fn update(id: impl Into<String>, data: DocumentState) -> Self {
        Self::Update { id: id.into(), data }
    }

    /// The sending peer's id, used for self-message filtering.
    pub fn peer_id(&self) -> &str {
        match self {
            Self::Request { id } | Self::Update { id, .. } => id,
        }
    }

    /// Serialize to the textual wire format.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Deserialize from the textual wire format.
    ///
    /// A malformed envelope (bad JSON, missing `type`/`id`) fails here;
    /// callers log and drop it without touching document state.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Protocol errors.
#[derive(Debug, Clone)]
pub enum ProtocolError {
    Serialization(String),
    Deserialization(String),
    ConnectionClosed,
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialization(e) => write!(f, "Deserialization error: {e}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for ProtocolError {}
