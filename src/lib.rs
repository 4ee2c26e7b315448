//! Observable state stores whose state changes only through explicit,
//! producer-driven mutations.
//!
//! Readers always see immutable `Arc<T>` snapshots. Writers describe a change
//! as in-place edits on a draft; a pluggable [`produce::MutationProducer`]
//! turns those edits into a new snapshot, and the base
//! [`core::store::Store`] decides with its equality function whether
//! subscribers hear about it.
//!
//! # Examples
//!
//! Naive clone-and-mutate with the default strict equality:
//! ```
//! use immustore::{config::ImmutableStoreConfig, core::immutable::ImmutableStore};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! let mut store = ImmutableStore::new(ImmutableStoreConfig::new(Counter { count: 0 }));
//! let mut events = store.subscribe();
//!
//! store.mutate(|c| c.count += 1, Some("increment")).expect("mutate");
//!
//! assert_eq!(store.state().count, 1);
//! let event = events.try_recv().expect("event");
//! assert_eq!(event.label(), Some("increment"));
//! ```
//!
//! Copy-on-write drafts with structural sharing and SQLite journaling:
//! ```no_run
//! use immustore::{
//!     config::ImmutableStoreConfig,
//!     core::immutable::ImmutableStore,
//!     persist::sqlite::SqliteStateSink,
//!     produce::StructuralProducer,
//! };
//!
//! let sink = SqliteStateSink::open("state.db").expect("open sqlite");
//! let config = sink.resume(Vec::<String>::new()).expect("resume");
//! let mut store = ImmutableStore::new(
//!     ImmutableStoreConfig::from_store(config).with_mutation_producer(StructuralProducer),
//! );
//! store.mutate(|items| items.push("hello".to_string()), Some("add")).expect("mutate");
//! store.flush().expect("flush");
//! ```
#![deny(missing_docs)]

/// Store configuration and option loading.
pub mod config;
/// Base store and producer-guarded store.
pub mod core;
/// Event stream payloads.
pub mod events;
/// Transition journal abstraction and SQLite implementation.
pub mod persist;
/// Mutation-producer contract and strategies.
pub mod produce;
/// Committed transition records.
pub mod transition;
/// Shared aliases and equality functions.
pub mod types;
