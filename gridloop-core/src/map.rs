//! Keyed collection of last-write-wins registers.
//!
//! The register storage is private; callers only see values through
//! accessors and cloned state snapshots, so no mutable references
//! escape the component boundary. Keys are never structurally removed:
//! deletion writes a tombstone and merge only ever adds or updates
//! registers, which keeps the map monotone under replay.

use std::collections::HashMap;

use crate::register::{LwwRegister, RegisterState};

/// Serializable snapshot of a map: every key's full triple.
///
/// Transmitted wholesale (no delta compression), so any single snapshot
/// lets a receiver reconstruct complete knowledge.
pub type MapState<T> = HashMap<String, RegisterState<T>>;

/// A map from string keys to LWW registers, owned by one replica.
pub struct LwwMap<T> {
    id: String,
    data: HashMap<String, LwwRegister<T>>,
}

impl<T: Clone> LwwMap<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
        }
    }

    /// Rebuild a map from a received snapshot.
    pub fn from_state(id: impl Into<String>, state: MapState<T>) -> Self {
        let id = id.into();
        let data = state
            .into_iter()
            .map(|(key, triple)| (key, LwwRegister::new(id.clone(), triple)))
            .collect();
        Self { id, data }
    }

    /// The visible value for `key`, `None` when absent or tombstoned.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|register| register.value())
    }

    /// Whether `key` has a visible (non-tombstone) value.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Local write: create a register at counter 1 if the key is new,
    /// otherwise write through the existing register.
    pub fn set(&mut self, key: &str, value: T) {
        self.write(key, Some(value));
    }

    /// Tombstone write. The register stays, so the deletion can itself
    /// lose to a newer concurrent write.
    pub fn delete(&mut self, key: &str) {
        if self.data.contains_key(key) {
            self.write(key, None);
        }
    }

    fn write(&mut self, key: &str, value: Option<T>) {
        match self.data.get_mut(key) {
            Some(register) => register.set(value),
            None => {
                self.data
                    .insert(key.to_string(), LwwRegister::from_value(self.id.clone(), value));
            }
        }
    }

    /// Merge a remote snapshot, register by register.
    ///
    /// Unknown keys materialize a new register directly from the remote
    /// triple; keys absent from the snapshot are left untouched.
    /// Returns whether any register changed.
    pub fn merge(&mut self, remote: MapState<T>) -> bool {
        let mut changed = false;
        for (key, triple) in remote {
            match self.data.get_mut(&key) {
                Some(register) => {
                    changed |= register.merge(triple);
                }
                None => {
                    self.data.insert(key, LwwRegister::new(self.id.clone(), triple));
                    changed = true;
                }
            }
        }
        changed
    }

    /// Full snapshot of every register, tombstones included.
    pub fn state(&self) -> MapState<T> {
        self.data
            .iter()
            .map(|(key, register)| (key.clone(), register.state().clone()))
            .collect()
    }

    /// Visible values only, tombstones filtered out.
    pub fn values(&self) -> HashMap<String, T> {
        self.data
            .iter()
            .filter_map(|(key, register)| register.value().map(|v| (key.clone(), v.clone())))
            .collect()
    }
}
