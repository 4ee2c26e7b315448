use std::sync::Arc;

use super::{Draft, MutationError, MutationProducer, Recipe};

/// Copy-on-write producer with structural sharing.
///
/// The recipe starts on a draft that borrows the current snapshot. A recipe
/// that never writes yields the current `Arc` itself, so strict equality
/// reports no change. The first write shallow-clones `T`; fields held behind
/// `Arc` stay shared with the previous snapshot until the recipe detaches
/// them with `Arc::make_mut`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralProducer;

impl<T: Clone> MutationProducer<T> for StructuralProducer {
    fn produce(&self, current: &Arc<T>, recipe: &mut Recipe<'_, T>) -> Result<Arc<T>, MutationError> {
        let mut draft = Draft::borrowed(&**current);
        recipe(&mut draft)?;
        Ok(match draft.finish() {
            Some(next) => Arc::new(next),
            None => Arc::clone(current),
        })
    }
}
