use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    config::ImmutableStoreConfig,
    events::StoreEvent,
    produce::{BoxError, Draft, MutationError, MutationProducer, ProducerKind, resolve_producer},
    types::Seq,
};

use super::store::{Store, StoreError, UpdateOutcome};

/// Store whose state can only change through a producer strategy.
///
/// Readers get `Arc<T>` snapshots. Writers describe edits as in-place
/// mutations of a draft; the configured [`MutationProducer`] turns them into a
/// new snapshot, which is handed to the base [`Store`]'s update primitive.
/// No other write path is exposed.
pub struct ImmutableStore<T: Clone> {
    store: Store<T>,
    producer: Arc<dyn MutationProducer<T>>,
    producer_kind: ProducerKind,
}

impl<T: Clone + Send + Sync + 'static> ImmutableStore<T> {
    /// Builds the base store and resolves the producer strategy.
    pub fn new(config: ImmutableStoreConfig<T>) -> Self {
        let ImmutableStoreConfig {
            store,
            mutation_producer,
            clone_and_mutate,
        } = config;
        let (producer, producer_kind) = resolve_producer(mutation_producer, clone_and_mutate);
        let store = Store::new(store);
        debug!(store = %store.name(), ?producer_kind, "immutable store ready");

        Self {
            store,
            producer,
            producer_kind,
        }
    }

    /// Mutates the state through the full mutable view.
    ///
    /// ```
    /// use immustore::{config::ImmutableStoreConfig, core::immutable::ImmutableStore};
    ///
    /// let mut store = ImmutableStore::new(ImmutableStoreConfig::new(vec![1, 2]));
    /// store.mutate(|items| items.push(3), Some("push")).unwrap();
    /// assert_eq!(*store.state(), vec![1, 2, 3]);
    /// ```
    pub fn mutate<F>(&mut self, mutator: F, label: Option<&str>) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut T),
    {
        self.run(
            move |draft| {
                mutator(draft.to_mut());
                Ok(())
            },
            label,
        )
    }

    /// Mutates the state through a read-first draft.
    ///
    /// Reads go through the draft; writes require [`Draft::to_mut`]. Under
    /// [`crate::produce::StructuralProducer`] a mutator that only reads leaves
    /// the snapshot identical.
    pub fn mutate_draft<F>(&mut self, mutator: F, label: Option<&str>) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut Draft<'_, T>),
    {
        self.run(
            move |draft| {
                mutator(draft);
                Ok(())
            },
            label,
        )
    }

    /// Mutates the state with a mutator that may fail mid-edit.
    ///
    /// The mutator's error surfaces as [`MutationError::Aborted`] and the
    /// store keeps its previous snapshot.
    pub fn try_mutate<F, E>(&mut self, mutator: F, label: Option<&str>) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut T) -> Result<(), E>,
        E: Into<BoxError>,
    {
        self.run(
            move |draft| mutator(draft.to_mut()).map_err(MutationError::aborted),
            label,
        )
    }

    fn run<F>(&mut self, recipe: F, label: Option<&str>) -> Result<UpdateOutcome, StoreError>
    where
        F: FnOnce(&mut Draft<'_, T>) -> Result<(), MutationError>,
    {
        let producer = &self.producer;
        let mut recipe = Some(recipe);
        let mut once = |draft: &mut Draft<'_, T>| -> Result<(), MutationError> {
            let recipe = recipe.take().ok_or(MutationError::RecipeConsumed)?;
            recipe(draft)
        };
        self.store.try_update(
            |current| producer.produce(current, &mut once).map_err(StoreError::from),
            label,
        )
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<T> {
        self.store.state()
    }

    /// Store name from the options.
    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Sequence of the last committed transition.
    pub fn seq(&self) -> Seq {
        self.store.seq()
    }

    /// Subscribes to events for transitions committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent<T>> {
        self.store.subscribe()
    }

    /// Strategy resolved at construction.
    pub fn producer_kind(&self) -> ProducerKind {
        self.producer_kind
    }

    /// Read-only access to the wrapped store.
    pub fn base(&self) -> &Store<T> {
        &self.store
    }

    /// Flushes the journal, if any.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }
}
