//! Error type for the CRDT core.
//!
//! Almost nothing in this crate can fail: register and map merges are
//! total, and a merge of an irrelevant snapshot is a safe no-op. The
//! only hard failures are out-of-range indices, which signal a caller
//! bug rather than a network condition.

/// Errors produced by the CRDT core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Step index outside `[0, STEP_COUNT)`.
    StepOutOfRange { index: usize },
    /// Track index outside `[0, TRACK_COUNT)`.
    TrackOutOfRange { index: usize },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StepOutOfRange { index } => {
                write!(f, "step index {index} out of range (0-{})", crate::STEP_COUNT - 1)
            }
            Self::TrackOutOfRange { index } => {
                write!(f, "track index {index} out of range (0-{})", crate::TRACK_COUNT - 1)
            }
        }
    }
}

impl std::error::Error for CoreError {}
