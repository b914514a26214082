//! Last-write-wins register: the smallest CRDT unit.
//!
//! A register is a single versioned value tagged with the peer that
//! wrote it and a monotonically increasing logical counter. Merging two
//! registers keeps the triple with the higher counter; equal counters
//! are broken by the lexicographically *lower* peer id. The rule is
//! deterministic and symmetric, so merges commute and need no global
//! clock.
//!
//! A `None` value is a tombstone: deletion is just another write and
//! can itself lose to a newer concurrent write.

use serde::{Deserialize, Serialize};

/// The serializable triple `(peer, counter, value)`.
///
/// Encodes as a JSON array `[peer, counter, value|null]` — the unit of
/// wire transfer for a single register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterState<T>(pub String, pub u64, pub Option<T>);

impl<T> RegisterState<T> {
    pub fn peer(&self) -> &str {
        &self.0
    }

    pub fn counter(&self) -> u64 {
        self.1
    }

    pub fn value(&self) -> Option<&T> {
        self.2.as_ref()
    }
}

/// A last-write-wins register owned by one replica.
#[derive(Debug, Clone)]
pub struct LwwRegister<T> {
    /// Id of the local replica — the writer recorded on local `set`s.
    id: String,
    state: RegisterState<T>,
}

impl<T: Clone> LwwRegister<T> {
    /// Adopt an existing triple (e.g. one received from a remote peer).
    pub fn new(id: impl Into<String>, state: RegisterState<T>) -> Self {
        Self { id: id.into(), state }
    }

    /// Create a register for a first local write, at counter 1.
    pub fn from_value(id: impl Into<String>, value: Option<T>) -> Self {
        let id = id.into();
        let state = RegisterState(id.clone(), 1, value);
        Self { id, state }
    }

    /// The current visible value, `None` when tombstoned.
    pub fn value(&self) -> Option<&T> {
        self.state.value()
    }

    /// The full `(peer, counter, value)` triple.
    pub fn state(&self) -> &RegisterState<T> {
        &self.state
    }

    /// Local write: bump the counter and record ourselves as the writer.
    ///
    /// `None` writes a tombstone.
    pub fn set(&mut self, value: Option<T>) {
        self.state = RegisterState(self.id.clone(), self.state.counter() + 1, value);
    }

    /// Merge a remote triple into this register.
    ///
    /// The remote wins iff it has a higher counter, or an equal counter
    /// and a lexicographically lower peer id. When it wins the local
    /// state becomes exactly the remote triple, remote writer included.
    /// Returns whether the local state changed.
    pub fn merge(&mut self, remote: RegisterState<T>) -> bool {
        let local_counter = self.state.counter();
        let remote_wins = remote.counter() > local_counter
            || (remote.counter() == local_counter && remote.peer() < self.state.peer());

        if remote_wins {
            self.state = remote;
        }
        remote_wins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_increments_counter_and_records_writer() {
        let mut reg = LwwRegister::from_value("p1", Some(10));
        assert_eq!(reg.state().counter(), 1);

        reg.set(Some(20));
        assert_eq!(reg.state().counter(), 2);
        assert_eq!(reg.state().peer(), "p1");
        assert_eq!(reg.value(), Some(&20));
    }

    #[test]
    fn test_higher_counter_wins() {
        let mut reg = LwwRegister::from_value("p1", Some(1));
        assert!(reg.merge(RegisterState("p2".into(), 5, Some(99))));
        assert_eq!(reg.value(), Some(&99));

        // Stale remote loses
        assert!(!reg.merge(RegisterState("p3".into(), 2, Some(0))));
        assert_eq!(reg.value(), Some(&99));
    }

    #[test]
    fn test_tie_breaks_to_lower_peer_id() {
        // "a" sorts lower than "b" — "a"'s value must survive on both sides.
        let mut on_b = LwwRegister::new("b", RegisterState("b".into(), 3, Some("from-b")));
        assert!(on_b.merge(RegisterState("a".into(), 3, Some("from-a"))));
        assert_eq!(on_b.value(), Some(&"from-a"));

        let mut on_a = LwwRegister::new("a", RegisterState("a".into(), 3, Some("from-a")));
        assert!(!on_a.merge(RegisterState("b".into(), 3, Some("from-b"))));
        assert_eq!(on_a.value(), Some(&"from-a"));
    }

    #[test]
    fn test_winning_merge_adopts_remote_writer() {
        let mut reg = LwwRegister::from_value("p1", Some(1));
        reg.merge(RegisterState("p9".into(), 7, Some(2)));
        // The recorded writer is the remote peer, not the receiving replica.
        assert_eq!(reg.state().peer(), "p9");
        assert_eq!(reg.state().counter(), 7);
    }

    #[test]
    fn test_newer_write_overrides_tombstone() {
        let mut reg = LwwRegister::from_value("p1", Some(1));
        reg.set(None); // counter 2, tombstone
        assert_eq!(reg.value(), None);

        assert!(reg.merge(RegisterState("p2".into(), 3, Some(42))));
        assert_eq!(reg.value(), Some(&42));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut reg = LwwRegister::from_value("p1", Some(1));
        let remote = RegisterState("p2".into(), 4, Some(8));

        reg.merge(remote.clone());
        let after_first = reg.state().clone();
        reg.merge(remote);
        assert_eq!(reg.state(), &after_first);
    }

    #[test]
    fn test_merge_commutes() {
        let a = RegisterState("a".into(), 2, Some(10));
        let b = RegisterState("b".into(), 3, Some(20));

        let mut ab = LwwRegister::from_value("z", Some(0));
        ab.merge(a.clone());
        ab.merge(b.clone());

        let mut ba = LwwRegister::from_value("z", Some(0));
        ba.merge(b);
        ba.merge(a);

        assert_eq!(ab.state(), ba.state());
    }
}
