use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use immustore::{
    config::ImmutableStoreConfig,
    core::{
        immutable::ImmutableStore,
        store::{StoreError, UpdateOutcome},
    },
    events::StoreEvent,
    produce::{Draft, MutationError, MutationProducer, ProducerKind, Recipe, StructuralProducer},
    types::deep_equal,
};

#[derive(Debug, Clone, PartialEq)]
struct Profile {
    name: String,
    visits: u32,
    tags: Arc<Vec<String>>,
}

fn profile() -> Profile {
    Profile {
        name: "ada".to_string(),
        visits: 0,
        tags: Arc::new(vec!["admin".to_string()]),
    }
}

fn naive_store() -> ImmutableStore<Profile> {
    ImmutableStore::new(ImmutableStoreConfig::new(profile()).with_name("profile"))
}

fn structural_store() -> ImmutableStore<Profile> {
    ImmutableStore::new(
        ImmutableStoreConfig::new(profile())
            .with_name("profile")
            .with_mutation_producer(StructuralProducer),
    )
}

fn structural_via_fn(
    current: &Arc<Profile>,
    recipe: &mut Recipe<'_, Profile>,
) -> Result<Arc<Profile>, MutationError> {
    StructuralProducer.produce(current, recipe)
}

struct CountingProducer {
    calls: Arc<AtomicUsize>,
}

impl MutationProducer<Profile> for CountingProducer {
    fn produce(
        &self,
        current: &Arc<Profile>,
        recipe: &mut Recipe<'_, Profile>,
    ) -> Result<Arc<Profile>, MutationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StructuralProducer.produce(current, recipe)
    }
}

struct RunsRecipeTwice;

impl MutationProducer<Profile> for RunsRecipeTwice {
    fn produce(
        &self,
        current: &Arc<Profile>,
        recipe: &mut Recipe<'_, Profile>,
    ) -> Result<Arc<Profile>, MutationError> {
        let mut draft = Draft::borrowed(&**current);
        recipe(&mut draft)?;
        recipe(&mut draft)?;
        Ok(Arc::new(draft.into_owned()))
    }
}

#[test]
fn failing_mutator_leaves_state_pointer_equal() {
    for mut store in [naive_store(), structural_store()] {
        let mut events = store.subscribe();
        let before = store.state();

        let err = store
            .try_mutate(
                |p| {
                    p.visits = 99;
                    p.name.clear();
                    Err("rejected")
                },
                Some("bad"),
            )
            .unwrap_err();

        assert!(matches!(err, StoreError::Mutation(MutationError::Aborted(_))));
        assert!(Arc::ptr_eq(&before, &store.state()));
        assert_eq!(store.seq(), 0);
        assert!(events.try_recv().is_err());
    }
}

#[test]
fn panicking_mutator_leaves_state_untouched() {
    let mut store = naive_store();
    let before = store.state();

    let result = catch_unwind(AssertUnwindSafe(|| {
        store.mutate(
            |p| {
                p.visits += 1;
                panic!("mutator blew up");
            },
            None,
        )
    }));

    assert!(result.is_err());
    assert!(Arc::ptr_eq(&before, &store.state()));
    store.mutate(|p| p.visits += 1, None).unwrap();
    assert_eq!(store.state().visits, 1);
}

#[test]
fn earlier_snapshots_never_observe_later_mutations() {
    let mut store = naive_store();
    let first = store.state();

    store.mutate(|p| p.visits = 1, None).unwrap();
    let second = store.state();

    store
        .mutate(
            |p| {
                p.visits = 2;
                Arc::make_mut(&mut p.tags).push("editor".to_string());
            },
            None,
        )
        .unwrap();

    assert_eq!(first.visits, 0);
    assert_eq!(second.visits, 1);
    assert_eq!(second.tags.len(), 1);
    assert_eq!(store.state().tags.len(), 2);
}

#[test]
fn escaped_draft_copy_does_not_write_back() {
    let mut store = naive_store();
    let mut escaped = None;

    store
        .mutate(
            |p| {
                p.visits = 5;
                escaped = Some(p.clone());
            },
            None,
        )
        .unwrap();

    let mut escaped = escaped.unwrap();
    escaped.visits = 100;
    escaped.name.push_str("-changed");

    assert_eq!(store.state().visits, 5);
    assert_eq!(store.state().name, "ada");
}

#[test]
fn setting_one_field_keeps_every_other_field() {
    for mut store in [naive_store(), structural_store()] {
        let before = store.state();
        store.mutate(|p| p.name = "grace".to_string(), None).unwrap();
        let after = store.state();

        assert_eq!(after.name, "grace");
        assert_eq!(after.visits, before.visits);
        assert_eq!(after.tags, before.tags);
    }
}

#[test]
fn edit_then_revert_is_silent_under_deep_equality() {
    let mut store = ImmutableStore::new(
        ImmutableStoreConfig::new(profile()).with_equality_fn(deep_equal::<Profile>),
    );
    let mut events = store.subscribe();
    let before = store.state();

    let outcome = store
        .mutate(
            |p| {
                p.visits += 1;
                p.visits -= 1;
            },
            Some("noop"),
        )
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Unchanged);
    assert!(Arc::ptr_eq(&before, &store.state()));
    assert!(events.try_recv().is_err());
}

#[test]
fn edit_then_revert_counts_as_change_under_strict_equality() {
    let mut store = naive_store();
    let mut events = store.subscribe();

    let outcome = store
        .mutate(
            |p| {
                p.visits += 1;
                p.visits -= 1;
            },
            Some("noop"),
        )
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Changed { seq: 1 });
    let event = events.try_recv().unwrap();
    assert_eq!(**event.state(), profile());
}

#[test]
fn defaults_to_naive_clone() {
    let mut store = naive_store();
    assert_eq!(store.producer_kind(), ProducerKind::Naive);

    let before = store.state();
    let outcome = store.mutate_draft(|_draft| {}, None).unwrap();
    assert!(outcome.is_changed());
    assert!(!Arc::ptr_eq(&before, &store.state()));
}

#[test]
fn clone_fn_takes_precedence_over_naive_default() {
    let clones = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&clones);
    let mut store = ImmutableStore::new(ImmutableStoreConfig::new(profile()).with_clone_and_mutate(
        move |p: &Profile| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(p.clone())
        },
    ));

    assert_eq!(store.producer_kind(), ProducerKind::CloneAndMutate);
    store.mutate(|p| p.visits = 3, None).unwrap();
    store.mutate(|p| p.visits = 4, None).unwrap();
    assert_eq!(clones.load(Ordering::SeqCst), 2);
    assert_eq!(store.state().visits, 4);
}

#[test]
fn producer_takes_precedence_over_clone_fn() {
    let clones = Arc::new(AtomicUsize::new(0));
    let produced = Arc::new(AtomicUsize::new(0));
    let clone_counter = Arc::clone(&clones);

    let mut store = ImmutableStore::new(
        ImmutableStoreConfig::new(profile())
            .with_clone_and_mutate(move |p: &Profile| {
                clone_counter.fetch_add(1, Ordering::SeqCst);
                Ok(p.clone())
            })
            .with_mutation_producer(CountingProducer {
                calls: Arc::clone(&produced),
            }),
    );

    assert_eq!(store.producer_kind(), ProducerKind::Producer);
    store.mutate(|p| p.visits = 7, None).unwrap();
    assert_eq!(produced.load(Ordering::SeqCst), 1);
    assert_eq!(clones.load(Ordering::SeqCst), 0);
}

#[test]
fn plain_function_works_as_producer() {
    let mut store = ImmutableStore::new(
        ImmutableStoreConfig::new(profile()).with_mutation_producer(structural_via_fn),
    );
    let before = store.state();

    store.mutate(|p| p.visits = 2, None).unwrap();

    assert_eq!(store.state().visits, 2);
    assert!(Arc::ptr_eq(&before.tags, &store.state().tags));
}

#[test]
fn label_reaches_base_store_unmodified() {
    let mut store = naive_store();
    let mut events = store.subscribe();

    store.mutate(|p| p.visits += 1, Some("increment")).unwrap();

    match events.try_recv().unwrap() {
        StoreEvent::Changed { seq, label, state } => {
            assert_eq!(seq, 1);
            assert_eq!(label.as_deref(), Some("increment"));
            assert_eq!(state.visits, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn unlabeled_mutation_carries_no_label() {
    let mut store = naive_store();
    let mut events = store.subscribe();

    store.mutate(|p| p.visits += 1, None).unwrap();

    assert_eq!(events.try_recv().unwrap().label(), None);
}

#[test]
fn producer_that_reruns_recipe_is_rejected() {
    let mut store = ImmutableStore::new(
        ImmutableStoreConfig::new(profile()).with_mutation_producer(RunsRecipeTwice),
    );
    let before = store.state();

    let err = store.mutate(|p| p.visits += 1, None).unwrap_err();

    assert!(matches!(err, StoreError::Mutation(MutationError::RecipeConsumed)));
    assert!(Arc::ptr_eq(&before, &store.state()));
}

#[test]
fn each_committed_mutation_advances_seq_by_one() {
    let mut store = naive_store();
    for expected in 1..=5 {
        let outcome = store.mutate(|p| p.visits += 1, None).unwrap();
        assert_eq!(outcome, UpdateOutcome::Changed { seq: expected });
    }
    assert_eq!(store.seq(), 5);
    assert_eq!(store.base().seq(), 5);
}
