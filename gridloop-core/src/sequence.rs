//! Per-track step sequence.
//!
//! Each of the 16 steps lives in its own register under the key
//! `step-<i>`, so concurrent edits to different steps never conflict.
//!
//! `toggle_step` is a read-then-write, not a true CRDT operation: two
//! concurrent toggles of the same step both win at the register level
//! but only one write survives the LWW comparison, so one toggle can
//! silently overwrite the other instead of composing. That is the
//! documented trade-off of keeping steps as plain LWW booleans.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::map::{LwwMap, MapState};
use crate::notify::{ListenerId, Listeners};
use crate::STEP_COUNT;

/// One sequencer step. Encodes as the single-element array `[active]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[bool; 1]", into = "[bool; 1]")]
pub struct Step(pub bool);

impl Step {
    pub fn active(&self) -> bool {
        self.0
    }
}

impl From<[bool; 1]> for Step {
    fn from(value: [bool; 1]) -> Self {
        Step(value[0])
    }
}

impl From<Step> for [bool; 1] {
    fn from(step: Step) -> Self {
        [step.0]
    }
}

fn step_key(index: usize) -> String {
    format!("step-{index}")
}

fn check_index(index: usize) -> Result<(), CoreError> {
    if index < STEP_COUNT {
        Ok(())
    } else {
        Err(CoreError::StepOutOfRange { index })
    }
}

/// CRDT wrapper for one track's step sequence.
pub struct Sequencer {
    track_index: usize,
    data: LwwMap<Step>,
    listeners: Listeners,
}

impl Sequencer {
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
        state: MapState<Step>,
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

    /// The step at `index`, inactive when never written.
    pub fn step(&self, index: usize) -> Result<Step, CoreError> {
        check_index(index)?;
        Ok(self.data.get(&step_key(index)).copied().unwrap_or(Step(false)))
    }

    pub fn set_step(&mut self, index: usize, step: Step) -> Result<(), CoreError> {
        check_index(index)?;
        self.data.set(&step_key(index), step);
        self.listeners.notify();
        Ok(())
    }

    /// Flip the step and return its new state.
    pub fn toggle_step(&mut self, index: usize) -> Result<bool, CoreError> {
        let current = self.step(index)?;
        let toggled = Step(!current.0);
        self.data.set(&step_key(index), toggled);
        self.listeners.notify();
        Ok(toggled.0)
    }

    pub fn clear_step(&mut self, index: usize) -> Result<(), CoreError> {
        self.set_step(index, Step(false))
    }

    /// Write every step inactive; listeners fire once.
    pub fn clear_all(&mut self) {
        for index in 0..STEP_COUNT {
            self.data.set(&step_key(index), Step(false));
        }
        self.listeners.notify();
    }

    /// All steps in index order, absent steps defaulting to inactive.
    pub fn steps(&self) -> [Step; STEP_COUNT] {
        std::array::from_fn(|index| {
            self.data.get(&step_key(index)).copied().unwrap_or(Step(false))
        })
    }

    /// The boolean pattern the playback engine consumes.
    pub fn active_steps(&self) -> [bool; STEP_COUNT] {
        self.steps().map(|step| step.0)
    }

    /// Merge a remote snapshot; listeners fire only when the visible
    /// pattern changed. Returns whether it did.
    pub fn merge(&mut self, remote: MapState<Step>) -> bool {
        let before = self.steps();
        self.data.merge(remote);
        let changed = self.steps() != before;
        if changed {
            self.listeners.notify();
        }
        changed
    }

    pub fn state(&self) -> MapState<Step> {
        self.data.state()
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ListenerId {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
