use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    config::StoreConfig,
    events::StoreEvent,
    persist::{PersistError, StateSink},
    produce::MutationError,
    transition::{Transition, TransitionKind},
    types::{EqualityFn, Seq, strict_equality},
};

use super::history::{History, HistoryEntry};

/// Errors surfaced by store writes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The mutator or producer failed; nothing was committed.
    #[error(transparent)]
    Mutation(#[from] MutationError),
    /// The journal rejected the transition; nothing was committed.
    #[error("journaling failed: {0}")]
    Persist(#[from] PersistError),
    /// Undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
}

/// Result of a single transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new state differed and was committed under `seq`.
    Changed {
        /// Sequence of the committed transition.
        seq: Seq,
    },
    /// The equality function judged the new state equal; nothing happened.
    Unchanged,
}

impl UpdateOutcome {
    /// True when a transition was committed.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Observable state container.
///
/// Holds the current snapshot, decides with its equality function whether an
/// update is a change, and broadcasts every committed change. Writes take
/// `&mut self`, so updates are serialized and cannot nest.
pub struct Store<T> {
    name: String,
    state: Arc<T>,
    equality: EqualityFn<T>,
    events_tx: broadcast::Sender<StoreEvent<T>>,
    history: History<T>,
    sink: Option<Box<dyn StateSink<T>>>,
    seq: Seq,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Builds a store from `config`.
    pub fn new(config: StoreConfig<T>) -> Self {
        let StoreConfig {
            initial_state,
            initial_seq,
            options,
            state_equality_fn,
            sink,
        } = config;
        let (events_tx, _) = broadcast::channel(options.event_capacity.max(1));
        debug!(
            store = %options.name,
            seq = initial_seq,
            history_limit = options.history_limit,
            journaled = sink.is_some(),
            "store created"
        );

        Self {
            name: options.name,
            state: Arc::new(initial_state),
            equality: state_equality_fn.unwrap_or_else(strict_equality),
            events_tx,
            history: History::new(options.history_limit),
            sink,
            seq: initial_seq,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<T> {
        Arc::clone(&self.state)
    }

    /// Store name from the options.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sequence of the last committed transition.
    pub fn seq(&self) -> Seq {
        self.seq
    }

    /// Subscribes to events for transitions committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent<T>> {
        self.events_tx.subscribe()
    }

    /// Number of live event receivers.
    pub fn subscriber_count(&self) -> usize {
        self.events_tx.receiver_count()
    }

    /// Replaces the state with `value`.
    pub fn set(&mut self, value: T, label: Option<&str>) -> Result<UpdateOutcome, StoreError> {
        self.update(move |_| Arc::new(value), label)
    }

    /// Computes the next state from the current one.
    pub fn update<F>(&mut self, f: F, label: Option<&str>) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&Arc<T>) -> Arc<T>,
    {
        self.try_update(|current| Ok::<_, StoreError>(f(current)), label)
    }

    /// Computes the next state with a fallible function.
    ///
    /// An error from `f` propagates unchanged and leaves the store untouched.
    /// Otherwise the result is compared with the current state; if the
    /// equality function says it differs, it is journaled, committed and
    /// broadcast with `label`.
    pub fn try_update<F, E>(&mut self, f: F, label: Option<&str>) -> Result<UpdateOutcome, E>
    where
        F: FnOnce(&Arc<T>) -> Result<Arc<T>, E>,
        E: From<StoreError>,
    {
        let next = f(&self.state)?;
        if (self.equality)(&self.state, &next) {
            trace!(store = %self.name, label = ?label, "update produced no change");
            return Ok(UpdateOutcome::Unchanged);
        }

        let prev = Arc::clone(&self.state);
        let label = label.map(str::to_owned);
        let seq = self.commit(next, label.clone(), TransitionKind::Update)?;
        self.history.record(prev, label);
        Ok(UpdateOutcome::Changed { seq })
    }

    /// Restores the snapshot before the most recent change.
    pub fn undo(&mut self) -> Result<UpdateOutcome, StoreError> {
        let entry = self.history.pop_undo().ok_or(StoreError::NothingToUndo)?;
        let prev = Arc::clone(&self.state);
        match self.commit(Arc::clone(&entry.state), entry.label.clone(), TransitionKind::Undo) {
            Ok(seq) => {
                self.history.push_redo(HistoryEntry {
                    state: prev,
                    label: entry.label,
                });
                Ok(UpdateOutcome::Changed { seq })
            }
            Err(err) => {
                self.history.push_undo(entry);
                Err(err)
            }
        }
    }

    /// Re-applies the most recently undone change.
    pub fn redo(&mut self) -> Result<UpdateOutcome, StoreError> {
        let entry = self.history.pop_redo().ok_or(StoreError::NothingToRedo)?;
        let prev = Arc::clone(&self.state);
        match self.commit(Arc::clone(&entry.state), entry.label.clone(), TransitionKind::Redo) {
            Ok(seq) => {
                self.history.push_undo(HistoryEntry {
                    state: prev,
                    label: entry.label,
                });
                Ok(UpdateOutcome::Changed { seq })
            }
            Err(err) => {
                self.history.push_redo(entry);
                Err(err)
            }
        }
    }

    /// Undo steps currently available.
    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    /// Redo steps currently available.
    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    /// Flushes the journal, if any.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    fn commit(
        &mut self,
        next: Arc<T>,
        label: Option<String>,
        kind: TransitionKind,
    ) -> Result<Seq, StoreError> {
        let seq = self.seq + 1;
        if let Some(sink) = self.sink.as_mut() {
            let transition = Transition {
                seq,
                ts_ms: now_ms(),
                label: label.clone(),
                kind,
                state: Arc::clone(&next),
            };
            if let Err(err) = sink.record(&transition) {
                warn!(store = %self.name, seq, error = %err, "journaling failed, transition dropped");
                return Err(err.into());
            }
        }

        self.seq = seq;
        self.state = Arc::clone(&next);
        debug!(store = %self.name, seq, ?kind, label = ?label, "state committed");

        let event = match kind {
            TransitionKind::Update => StoreEvent::Changed {
                seq,
                label,
                state: next,
            },
            TransitionKind::Undo => StoreEvent::UndoApplied {
                seq,
                label,
                state: next,
            },
            TransitionKind::Redo => StoreEvent::RedoApplied {
                seq,
                label,
                state: next,
            },
        };
        let _ = self.events_tx.send(event);
        Ok(seq)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
