//! Committed state transitions and their persisted envelope.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Seq;

/// Version number for serialized [`TransitionEnvelope`] payloads.
pub const TRANSITION_FORMAT_VERSION: u16 = 1;

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// A regular update or mutation.
    Update,
    /// One undo step.
    Undo,
    /// One redo step.
    Redo,
}

impl TransitionKind {
    /// Stable integer code used by the journal's `kind` column.
    pub fn code(self) -> i64 {
        match self {
            Self::Update => 1,
            Self::Undo => 2,
            Self::Redo => 3,
        }
    }
}

/// One committed state change, as handed to a [`crate::persist::StateSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<T> {
    /// Monotonic transition sequence.
    pub seq: Seq,
    /// Commit timestamp in milliseconds.
    pub ts_ms: u64,
    /// Command label forwarded by the caller.
    pub label: Option<String>,
    /// Transition cause.
    pub kind: TransitionKind,
    /// State after the transition.
    pub state: Arc<T>,
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEnvelope<T> {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped transition.
    pub transition: Transition<T>,
}

impl<T> TransitionEnvelope<T> {
    /// Constructs an envelope using [`TRANSITION_FORMAT_VERSION`].
    pub fn new(transition: Transition<T>) -> Self {
        Self {
            format_version: TRANSITION_FORMAT_VERSION,
            transition,
        }
    }
}
