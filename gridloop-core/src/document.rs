//! The aggregate document: one global settings register plus four
//! (track settings, sequence) pairs, all owned by the same peer.
//!
//! The document is the unit of wire transfer: `state()` produces the
//! full serializable snapshot and `merge()` folds a remote snapshot in,
//! sub-map by sub-map. Merges across independent maps are pairwise
//! independent, so the order in which sub-components merge never
//! affects the converged result.
//!
//! The document is an explicitly constructed context object — callers
//! create one per session and pass it where it is needed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::map::MapState;
use crate::notify::{ListenerId, Listeners};
use crate::sequence::{Sequencer, Step};
use crate::settings::{Envelope, GlobalParams, GlobalSettings, TrackParams, TrackSettings};
use crate::TRACK_COUNT;

/// One track: synthesis settings plus its step sequence.
pub struct Track {
    pub settings: TrackSettings,
    pub sequence: Sequencer,
}

/// Serializable snapshot of one track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackState {
    pub settings: MapState<TrackParams>,
    pub sequence: MapState<Step>,
}

/// Full serializable document snapshot — the payload of an `update`
/// envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentState {
    pub global: MapState<GlobalParams>,
    pub tracks: Vec<TrackState>,
}

/// The shared sequencer document for one client session.
pub struct Document {
    id: String,
    global: GlobalSettings,
    tracks: Vec<Track>,
    listeners: Listeners,
}

impl Document {
    /// Create an empty document owned by `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let tracks = (0..TRACK_COUNT)
            .map(|index| Track {
                settings: TrackSettings::new(id.clone(), index),
                sequence: Sequencer::new(id.clone(), index),
            })
            .collect();
        Self {
            global: GlobalSettings::new(id.clone()),
            id,
            tracks,
            listeners: Listeners::new(),
        }
    }

    /// Create a document with a freshly generated peer id.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Restore a document from a previously received snapshot.
    ///
    /// Missing trailing tracks start empty; surplus remote tracks are
    /// ignored.
    pub fn from_state(id: impl Into<String>, mut state: DocumentState) -> Self {
        let id = id.into();
        state.tracks.truncate(TRACK_COUNT);
        state.tracks.resize_with(TRACK_COUNT, TrackState::default);

        let tracks = state
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| Track {
                settings: TrackSettings::from_state(id.clone(), index, track.settings),
                sequence: Sequencer::from_state(id.clone(), index, track.sequence),
            })
            .collect();

        Self {
            global: GlobalSettings::from_state(id.clone(), state.global),
            id,
            tracks,
            listeners: Listeners::new(),
        }
    }

    /// The owning peer id.
    pub fn peer_id(&self) -> &str {
        &self.id
    }

    pub fn global(&self) -> &GlobalSettings {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalSettings {
        &mut self.global
    }

    pub fn track(&self, index: usize) -> Result<&Track, CoreError> {
        self.tracks
            .get(index)
            .ok_or(CoreError::TrackOutOfRange { index })
    }

    pub fn track_mut(&mut self, index: usize) -> Result<&mut Track, CoreError> {
        self.tracks
            .get_mut(index)
            .ok_or(CoreError::TrackOutOfRange { index })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    // Convenience getters for the playback engine and UI.

    pub fn bpm(&self) -> f32 {
        self.global.bpm()
    }

    pub fn swing(&self) -> f32 {
        self.global.swing()
    }

    pub fn pan(&self) -> f32 {
        self.global.pan()
    }

    pub fn track_params(&self, track: usize) -> Result<TrackParams, CoreError> {
        Ok(self.track(track)?.settings.params())
    }

    pub fn track_pattern(&self, track: usize) -> Result<[bool; crate::STEP_COUNT], CoreError> {
        Ok(self.track(track)?.sequence.active_steps())
    }

    /// Every track's boolean pattern, in track order.
    pub fn all_patterns(&self) -> Vec<[bool; crate::STEP_COUNT]> {
        self.tracks
            .iter()
            .map(|track| track.sequence.active_steps())
            .collect()
    }

    // Mutations. Each delegates to the owning wrapper (which notifies
    // its own subscribers) and then fires the document listeners once.

    pub fn set_bpm(&mut self, bpm: f32) {
        self.global.set_bpm(bpm);
        self.listeners.notify();
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.global.set_swing(swing);
        self.listeners.notify();
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.global.set_pan(pan);
        self.listeners.notify();
    }

    pub fn set_envelope(&mut self, track: usize, envelope: Envelope) -> Result<(), CoreError> {
        self.track_mut(track)?.settings.set_envelope(envelope);
        self.listeners.notify();
        Ok(())
    }

    pub fn set_volume(&mut self, track: usize, volume: f32) -> Result<(), CoreError> {
        self.track_mut(track)?.settings.set_volume(volume);
        self.listeners.notify();
        Ok(())
    }

    pub fn set_muted(&mut self, track: usize, muted: bool) -> Result<(), CoreError> {
        self.track_mut(track)?.settings.set_muted(muted);
        self.listeners.notify();
        Ok(())
    }

    pub fn set_step(&mut self, track: usize, step: usize, value: Step) -> Result<(), CoreError> {
        self.track_mut(track)?.sequence.set_step(step, value)?;
        self.listeners.notify();
        Ok(())
    }

    /// Flip one step and return its new state.
    pub fn toggle_step(&mut self, track: usize, step: usize) -> Result<bool, CoreError> {
        let active = self.track_mut(track)?.sequence.toggle_step(step)?;
        self.listeners.notify();
        Ok(active)
    }

    pub fn clear_step(&mut self, track: usize, step: usize) -> Result<(), CoreError> {
        self.track_mut(track)?.sequence.clear_step(step)?;
        self.listeners.notify();
        Ok(())
    }

    pub fn clear_track(&mut self, track: usize) -> Result<(), CoreError> {
        self.track_mut(track)?.sequence.clear_all();
        self.listeners.notify();
        Ok(())
    }

    /// Merge a remote snapshot into every sub-component.
    ///
    /// Document listeners fire once, coalesced, after all sub-merges —
    /// never once per sub-component — so a sync layer can batch a
    /// single re-broadcast. Returns whether any visible value changed;
    /// a stale or all-tombstone snapshot is a safe no-op.
    pub fn merge(&mut self, remote: DocumentState) -> bool {
        let mut changed = self.global.merge(remote.global);

        for (track, remote_track) in self.tracks.iter_mut().zip(remote.tracks) {
            changed |= track.settings.merge(remote_track.settings);
            changed |= track.sequence.merge(remote_track.sequence);
        }

        if changed {
            log::trace!("document {}: remote merge changed visible state", self.id);
            self.listeners.notify();
        }
        changed
    }

    /// Full snapshot: the unit of wire transfer.
    pub fn state(&self) -> DocumentState {
        DocumentState {
            global: self.global.state(),
            tracks: self
                .tracks
                .iter()
                .map(|track| TrackState {
                    settings: track.settings.state(),
                    sequence: track.sequence.state(),
                })
                .collect(),
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
