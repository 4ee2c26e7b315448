//! Store configuration: serde-loadable options plus function-valued hooks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    persist::StateSink,
    produce::{CloneFn, MutationError, MutationProducer},
    types::{EqualityFn, Seq},
};

/// Plain store options that can be loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Store name used in log fields.
    pub name: String,
    /// Maximum undo depth. `0` disables history.
    pub history_limit: usize,
    /// Capacity of the broadcast event channel.
    pub event_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            history_limit: 0,
            event_capacity: 256,
        }
    }
}

impl StoreOptions {
    /// Parses options from a JSON object. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Construction-time configuration for [`crate::core::store::Store`].
pub struct StoreConfig<T> {
    /// State the store starts with.
    pub initial_state: T,
    /// Sequence of `initial_state`; the first commit gets `initial_seq + 1`.
    pub initial_seq: Seq,
    /// Plain options.
    pub options: StoreOptions,
    /// Change detector. Defaults to [`crate::types::strict_equal`].
    pub state_equality_fn: Option<EqualityFn<T>>,
    /// Optional transition journal.
    pub sink: Option<Box<dyn StateSink<T>>>,
}

impl<T> StoreConfig<T> {
    /// Config with default options around `initial_state`.
    pub fn new(initial_state: T) -> Self {
        Self {
            initial_state,
            initial_seq: 0,
            options: StoreOptions::default(),
            state_equality_fn: None,
            sink: None,
        }
    }

    /// Sets the store name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// Replaces all plain options.
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the undo depth.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.options.history_limit = limit;
        self
    }

    /// Sets the sequence the initial state corresponds to.
    pub fn with_initial_seq(mut self, seq: Seq) -> Self {
        self.initial_seq = seq;
        self
    }

    /// Sets the change detector.
    pub fn with_equality_fn(
        mut self,
        eq: impl Fn(&Arc<T>, &Arc<T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.state_equality_fn = Some(Arc::new(eq));
        self
    }

    /// Attaches a transition journal.
    pub fn with_sink(mut self, sink: impl StateSink<T> + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
}

/// Construction-time configuration for [`crate::core::immutable::ImmutableStore`].
///
/// Producer selection, first present wins: `mutation_producer`,
/// `clone_and_mutate`, then the built-in naive clone.
pub struct ImmutableStoreConfig<T: Clone> {
    /// Base store configuration.
    pub store: StoreConfig<T>,
    /// High-level draft/producer strategy.
    pub mutation_producer: Option<Arc<dyn MutationProducer<T>>>,
    /// Low-level clone step for the clone-and-mutate strategy.
    pub clone_and_mutate: Option<CloneFn<T>>,
}

impl<T: Clone> ImmutableStoreConfig<T> {
    /// Config with default options around `initial_state`.
    pub fn new(initial_state: T) -> Self {
        Self::from_store(StoreConfig::new(initial_state))
    }

    /// Wraps an existing base store config.
    pub fn from_store(store: StoreConfig<T>) -> Self {
        Self {
            store,
            mutation_producer: None,
            clone_and_mutate: None,
        }
    }

    /// Sets the store name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.store = self.store.with_name(name);
        self
    }

    /// Replaces all plain options.
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.store = self.store.with_options(options);
        self
    }

    /// Sets the change detector.
    pub fn with_equality_fn(
        mut self,
        eq: impl Fn(&Arc<T>, &Arc<T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.store = self.store.with_equality_fn(eq);
        self
    }

    /// Attaches a transition journal.
    pub fn with_sink(mut self, sink: impl StateSink<T> + 'static) -> Self {
        self.store = self.store.with_sink(sink);
        self
    }

    /// Selects a high-level producer strategy.
    pub fn with_mutation_producer(mut self, producer: impl MutationProducer<T> + 'static) -> Self {
        self.mutation_producer = Some(Arc::new(producer));
        self
    }

    /// Selects the clone-and-mutate strategy with a custom clone step.
    pub fn with_clone_and_mutate(
        mut self,
        clone: impl Fn(&T) -> Result<T, MutationError> + Send + Sync + 'static,
    ) -> Self {
        self.clone_and_mutate = Some(Arc::new(clone));
        self
    }
}
