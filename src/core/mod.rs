//! Base observable store and the producer-guarded store built on it.

pub(crate) mod history;
/// Producer-guarded store exposing only mutation entry points.
pub mod immutable;
/// Observable state container with equality-gated updates and undo/redo.
pub mod store;
