//! Typed wrappers for global and per-track settings.
//!
//! Each wrapper views one `LwwMap` through a single fixed key and falls
//! back to documented defaults when the key is absent or tombstoned.
//! Per-field setters are read-modify-write over the whole params struct,
//! so a field write bumps the one underlying register.

use serde::{Deserialize, Serialize};

use crate::map::{LwwMap, MapState};
use crate::notify::{ListenerId, Listeners};

/// Map key holding the global settings register.
pub const GLOBAL_SETTINGS_KEY: &str = "global-settings";

/// Map key holding a track's settings register.
pub const TRACK_SETTINGS_KEY: &str = "settings";

/// Tempo, swing and stereo pan shared by every track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalParams {
    pub bpm: f32,
    pub swing: f32,
    pub pan: f32,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            swing: 0.0,
            pan: 0.0,
        }
    }
}

/// ADSR amplitude envelope for one track's voice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.1,
            sustain: 0.1,
            release: 0.1,
        }
    }
}

/// Per-track synthesis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParams {
    pub envelope: Envelope,
    pub volume: f32,
    pub muted: bool,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            envelope: Envelope::default(),
            volume: 0.0,
            muted: false,
        }
    }
}

/// CRDT wrapper for the global settings register.
pub struct GlobalSettings {
    data: LwwMap<GlobalParams>,
    listeners: Listeners,
}

impl GlobalSettings {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            data: LwwMap::new(id),
            listeners: Listeners::new(),
        }
    }

    pub fn from_state(id: impl Into<String>, state: MapState<GlobalParams>) -> Self {
        Self {
            data: LwwMap::from_state(id, state),
            listeners: Listeners::new(),
        }
    }

    /// Current settings, or the defaults when never written.
    pub fn params(&self) -> GlobalParams {
        self.data
            .get(GLOBAL_SETTINGS_KEY)
            .copied()
            .unwrap_or_default()
    }

    pub fn bpm(&self) -> f32 {
        self.params().bpm
    }

    pub fn swing(&self) -> f32 {
        self.params().swing
    }

    pub fn pan(&self) -> f32 {
        self.params().pan
    }

    pub fn set_params(&mut self, params: GlobalParams) {
        self.data.set(GLOBAL_SETTINGS_KEY, params);
        self.listeners.notify();
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        let mut params = self.params();
        params.bpm = bpm;
        self.set_params(params);
    }

    pub fn set_swing(&mut self, swing: f32) {
        let mut params = self.params();
        params.swing = swing;
        self.set_params(params);
    }

    pub fn set_pan(&mut self, pan: f32) {
        let mut params = self.params();
        params.pan = pan;
        self.set_params(params);
    }

    /// Merge a remote snapshot; listeners fire only when the visible
    /// settings changed. Returns whether they did.
    pub fn merge(&mut self, remote: MapState<GlobalParams>) -> bool {
        let before = self.params();
        self.data.merge(remote);
        let changed = self.params() != before;
        if changed {
            self.listeners.notify();
        }
        changed
    }

    pub fn state(&self) -> MapState<GlobalParams> {
        self.data.state()
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

/// CRDT wrapper for one track's settings register.
pub struct TrackSettings {
    track_index: usize,
    data: LwwMap<TrackParams>,
    listeners: Listeners,
}

impl TrackSettings {
    pub fn new(id: impl Into<String>, track_index: usize) -> Self {
        Self {
            track_index,
            data: LwwMap::new(id),
            listeners: Listeners::new(),
        }
    }

    pub fn from_state(
        id: impl Into<String>,
        track_index: usize,
        state: MapState<TrackParams>,
    ) -> Self {
        Self {
            track_index,
            data: LwwMap::from_state(id, state),
            listeners: Listeners::new(),
        }
    }

    pub fn track_index(&self) -> usize {
        self.track_index
    }

    /// Current settings, or the defaults when never written.
    pub fn params(&self) -> TrackParams {
        self.data
            .get(TRACK_SETTINGS_KEY)
            .copied()
            .unwrap_or_default()
    }

    pub fn envelope(&self) -> Envelope {
        self.params().envelope
    }

    pub fn volume(&self) -> f32 {
        self.params().volume
    }

    pub fn muted(&self) -> bool {
        self.params().muted
    }

    pub fn set_params(&mut self, params: TrackParams) {
        self.data.set(TRACK_SETTINGS_KEY, params);
        self.listeners.notify();
    }

    pub fn set_envelope(&mut self, envelope: Envelope) {
        let mut params = self.params();
        params.envelope = envelope;
        self.set_params(params);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let mut params = self.params();
        params.volume = volume;
        self.set_params(params);
    }

    pub fn set_muted(&mut self, muted: bool) {
        let mut params = self.params();
        params.muted = muted;
        self.set_params(params);
    }

    /// Merge a remote snapshot; listeners fire only when the visible
    /// settings changed. Returns whether they did.
    pub fn merge(&mut self, remote: MapState<TrackParams>) -> bool {
        let before = self.params();
        self.data.merge(remote);
        let changed = self.params() != before;
        if changed {
            self.listeners.notify();
        }
        changed
    }

    pub fn state(&self) -> MapState<TrackParams> {
        self.data.state()
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_global_defaults() {
        let settings = GlobalSettings::new("p1");
        assert_eq!(settings.bpm(), 120.0);
        assert_eq!(settings.swing(), 0.0);
        assert_eq!(settings.pan(), 0.0);
    }

    #[test]
    fn test_set_bpm_preserves_other_fields() {
        let mut settings = GlobalSettings::new("p1");
        settings.set_swing(0.25);
        settings.set_bpm(140.0);

        assert_eq!(settings.bpm(), 140.0);
        assert_eq!(settings.swing(), 0.25);
    }

    #[test]
    fn test_field_setters_share_one_register() {
        let mut settings = GlobalSettings::new("p1");
        settings.set_bpm(100.0);
        settings.set_pan(-0.5);

        let state = settings.state();
        assert_eq!(state.len(), 1);
        assert_eq!(state[GLOBAL_SETTINGS_KEY].counter(), 2);
    }

    #[test]
    fn test_track_defaults() {
        let settings = TrackSettings::new("p1", 2);
        assert_eq!(settings.track_index(), 2);
        assert_eq!(settings.envelope(), Envelope::default());
        assert_eq!(settings.envelope().attack, 0.1);
        assert_eq!(settings.volume(), 0.0);
        assert!(!settings.muted());
    }

    #[test]
    fn test_track_setters() {
        let mut settings = TrackSettings::new("p1", 0);
        settings.set_volume(-6.0);
        settings.set_muted(true);
        settings.set_envelope(Envelope {
            attack: 0.01,
            decay: 0.2,
            sustain: 0.8,
            release: 0.5,
        });

        assert_eq!(settings.volume(), -6.0);
        assert!(settings.muted());
        assert_eq!(settings.envelope().sustain, 0.8);
    }

    #[test]
    fn test_merge_notifies_only_on_visible_change() {
        let count = Arc::new(AtomicUsize::new(0));

        let mut local = GlobalSettings::new("p1");
        let count_clone = count.clone();
        local.subscribe(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut remote = GlobalSettings::new("p2");
        remote.set_bpm(150.0);

        assert!(local.merge(remote.state()));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Re-merging the same snapshot changes nothing and stays silent
        assert!(!local.merge(remote.state()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_mutation_notifies() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut settings = TrackSettings::new("p1", 0);

        let count_clone = count.clone();
        settings.subscribe(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        settings.set_muted(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
