use std::{fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use super::{Draft, MutationError, MutationProducer, Recipe};

/// Clone step used by [`CloneAndMutate`].
pub type CloneFn<T> = Arc<dyn Fn(&T) -> Result<T, MutationError> + Send + Sync>;

/// Clones the whole state first, then lets the recipe edit the clone.
///
/// Always yields a fresh snapshot, even when the recipe writes nothing. The
/// current value is never reachable from the recipe, so a failing recipe can
/// only damage a clone that is dropped on return.
pub struct CloneAndMutate<T> {
    clone: CloneFn<T>,
}

impl<T> CloneAndMutate<T> {
    /// Strategy with a caller-supplied clone step.
    pub fn new(clone: CloneFn<T>) -> Self {
        Self { clone }
    }
}

impl<T: Clone + 'static> CloneAndMutate<T> {
    /// Strategy using `T::clone`. `Arc` fields inside `T` stay shared.
    pub fn naive() -> Self {
        Self::new(Arc::new(|value: &T| -> Result<T, MutationError> {
            Ok(value.clone())
        }))
    }
}

impl<T: Serialize + DeserializeOwned + 'static> CloneAndMutate<T> {
    /// Strategy using a serde_json round trip, detaching every `Arc` field.
    pub fn json() -> Self {
        Self::new(Arc::new(json_clone::<T>))
    }
}

impl<T> fmt::Debug for CloneAndMutate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneAndMutate").finish_non_exhaustive()
    }
}

impl<T: Clone> MutationProducer<T> for CloneAndMutate<T> {
    fn produce(&self, current: &Arc<T>, recipe: &mut Recipe<'_, T>) -> Result<Arc<T>, MutationError> {
        let mut draft = Draft::owned((self.clone)(&**current)?);
        recipe(&mut draft)?;
        Ok(Arc::new(draft.into_owned()))
    }
}

/// Deep clone through a `serde_json::Value`.
///
/// Fails for values serde_json cannot represent, such as maps with non-string keys.
pub fn json_clone<T: Serialize + DeserializeOwned>(value: &T) -> Result<T, MutationError> {
    let doc = serde_json::to_value(value).map_err(|err| MutationError::Clone(err.to_string()))?;
    serde_json::from_value(doc).map_err(|err| MutationError::Clone(err.to_string()))
}
