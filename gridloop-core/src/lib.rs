//! # gridloop-core — CRDT state for the collaborative step sequencer
//!
//! Every piece of shared state (pattern steps, per-track envelopes,
//! global tempo/swing) lives in a last-write-wins register. Registers
//! compose into keyed maps, maps into typed domain wrappers, and
//! wrappers into the aggregate [`Document`] that clients exchange as
//! whole snapshots.
//!
//! ```text
//! LwwRegister ── LwwMap ──┬── GlobalSettings ──┐
//!                         ├── TrackSettings  ──┼── Document
//!                         └── Sequencer      ──┘
//! ```
//!
//! Merges are commutative and idempotent by construction: replicas that
//! see the same set of snapshots — in any order, with duplicates —
//! converge to the same visible values. Playback and UI layers consume
//! the derived values read-only and subscribe for change notification;
//! they never touch register state directly.

pub mod document;
pub mod error;
pub mod map;
pub mod notify;
pub mod register;
pub mod sequence;
pub mod settings;

/// Number of tracks in a document.
pub const TRACK_COUNT: usize = 4;

/// Number of steps per track sequence.
pub const STEP_COUNT: usize = 16;

pub use document::{Document, DocumentState, Track, TrackState};
pub use error::CoreError;
pub use map::{LwwMap, MapState};
pub use notify::{ListenerId, Listeners};
pub use register::{LwwRegister, RegisterState};
pub use sequence::{Sequencer, Step};
pub use settings::{Envelope, GlobalParams, GlobalSettings, TrackParams, TrackSettings};
