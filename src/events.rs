//! Store event stream payloads.

use std::sync::Arc;

use crate::types::Seq;

/// Events broadcast to subscribers after each committed transition.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent<T> {
    /// An update or mutation changed the state.
    Changed {
        /// Transition sequence.
        seq: Seq,
        /// Command label, passed through unmodified.
        label: Option<String>,
        /// New state.
        state: Arc<T>,
    },
    /// One undo step was applied.
    UndoApplied {
        /// Transition sequence.
        seq: Seq,
        /// Label of the transition that was undone.
        label: Option<String>,
        /// Restored state.
        state: Arc<T>,
    },
    /// One redo step was applied.
    RedoApplied {
        /// Transition sequence.
        seq: Seq,
        /// Label of the transition that was redone.
        label: Option<String>,
        /// Restored state.
        state: Arc<T>,
    },
}

impl<T> StoreEvent<T> {
    /// Sequence of the transition this event reports.
    pub fn seq(&self) -> Seq {
        match self {
            Self::Changed { seq, .. } | Self::UndoApplied { seq, .. } | Self::RedoApplied { seq, .. } => *seq,
        }
    }

    /// Label carried by the transition.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Changed { label, .. }
            | Self::UndoApplied { label, .. }
            | Self::RedoApplied { label, .. } => label.as_deref(),
        }
    }

    /// State after the transition.
    pub fn state(&self) -> &Arc<T> {
        match self {
            Self::Changed { state, .. }
            | Self::UndoApplied { state, .. }
            | Self::RedoApplied { state, .. } => state,
        }
    }
}
