//! Mutation-producer contract, draft views, and strategy resolution.
//!
//! A producer turns `(current, recipe)` into a new state snapshot. The recipe
//! edits a [`Draft`] in place; the producer guarantees the snapshot it was
//! handed is never written to, whether the recipe succeeds, fails or panics.

/// Whole-value clone strategies.
pub mod clone;
/// Copy-on-write draft strategy with structural sharing.
pub mod structural;

use std::{borrow::Cow, fmt, ops::Deref, sync::Arc};

use thiserror::Error;
use tracing::debug;

pub use clone::{CloneAndMutate, CloneFn, json_clone};
pub use structural::StructuralProducer;

/// Boxed error raised by a fallible mutator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised while producing a new state.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The mutator reported a failure mid-edit.
    #[error("mutation aborted: {0}")]
    Aborted(#[source] BoxError),
    /// The clone step could not copy the current state.
    #[error("state clone failed: {0}")]
    Clone(String),
    /// A producer invoked its recipe more than once.
    #[error("mutation recipe invoked more than once")]
    RecipeConsumed,
}

impl MutationError {
    /// Wraps any error as [`MutationError::Aborted`].
    pub fn aborted(err: impl Into<BoxError>) -> Self {
        Self::Aborted(err.into())
    }
}

/// Recipe handed to a producer: edits a draft, may fail, runs at most once.
pub type Recipe<'r, T> = dyn for<'d> FnMut(&mut Draft<'d, T>) -> Result<(), MutationError> + 'r;

/// Copy-on-write view over a state value.
///
/// Reads go through `Deref`. The first [`Draft::to_mut`] detaches the draft
/// from the base value and marks it modified.
pub struct Draft<'a, T: Clone> {
    value: Cow<'a, T>,
    modified: bool,
}

impl<'a, T: Clone> Draft<'a, T> {
    /// Draft that shares `base` until first written.
    pub fn borrowed(base: &'a T) -> Self {
        Self {
            value: Cow::Borrowed(base),
            modified: false,
        }
    }

    /// Draft over a value the producer already owns.
    pub fn owned(value: T) -> Self {
        Self {
            value: Cow::Owned(value),
            modified: false,
        }
    }

    /// Mutable access. Clones the base value on first call if still borrowed.
    pub fn to_mut(&mut self) -> &mut T {
        self.modified = true;
        self.value.to_mut()
    }

    /// Replaces the whole draft value.
    pub fn set(&mut self, value: T) {
        self.modified = true;
        self.value = Cow::Owned(value);
    }

    /// True once the recipe asked for write access.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True when the draft no longer borrows the base value.
    pub fn is_detached(&self) -> bool {
        matches!(self.value, Cow::Owned(_))
    }

    /// The edited value, or `None` if the recipe never wrote.
    pub fn finish(self) -> Option<T> {
        self.modified.then(|| self.value.into_owned())
    }

    /// The draft value, cloning the base if it was never detached.
    pub fn into_owned(self) -> T {
        self.value.into_owned()
    }
}

impl<T: Clone> Deref for Draft<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Draft<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("value", &*self.value)
            .field("modified", &self.modified)
            .finish()
    }
}

/// Strategy mapping `(current, recipe)` to a new state snapshot.
///
/// Implementations must run `recipe` at most once, synchronously, and must
/// never write to `current`. On error, nothing the recipe did may escape.
pub trait MutationProducer<T: Clone>: Send + Sync {
    /// Produces the next state from `current` by running `recipe` on a draft.
    fn produce(&self, current: &Arc<T>, recipe: &mut Recipe<'_, T>) -> Result<Arc<T>, MutationError>;
}

impl<T, F> MutationProducer<T> for F
where
    T: Clone,
    F: for<'r> Fn(&Arc<T>, &mut Recipe<'r, T>) -> Result<Arc<T>, MutationError> + Send + Sync,
{
    fn produce(&self, current: &Arc<T>, recipe: &mut Recipe<'_, T>) -> Result<Arc<T>, MutationError> {
        self(current, recipe)
    }
}

/// Which strategy a store resolved at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerKind {
    /// Caller-supplied high-level producer.
    Producer,
    /// Caller-supplied clone step driving [`CloneAndMutate`].
    CloneAndMutate,
    /// Built-in [`CloneAndMutate::naive`].
    Naive,
}

/// Picks the producer: explicit producer, else custom clone step, else naive clone.
pub fn resolve_producer<T>(
    producer: Option<Arc<dyn MutationProducer<T>>>,
    clone_and_mutate: Option<CloneFn<T>>,
) -> (Arc<dyn MutationProducer<T>>, ProducerKind)
where
    T: Clone + Send + Sync + 'static,
{
    let (producer, kind): (Arc<dyn MutationProducer<T>>, _) = match (producer, clone_and_mutate) {
        (Some(producer), _) => (producer, ProducerKind::Producer),
        (None, Some(clone)) => (Arc::new(CloneAndMutate::new(clone)), ProducerKind::CloneAndMutate),
        (None, None) => (Arc::new(CloneAndMutate::<T>::naive()), ProducerKind::Naive),
    };
    debug!(?kind, "resolved mutation producer");
    (producer, kind)
}
