//! Shared primitive aliases and state equality functions.

use std::sync::Arc;

/// Monotonic transition sequence number.
pub type Seq = u64;

/// Decides whether two state snapshots are the same state.
pub type EqualityFn<T> = Arc<dyn Fn(&Arc<T>, &Arc<T>) -> bool + Send + Sync>;

/// Identity comparison: two snapshots are equal only if they share an allocation.
pub fn strict_equal<T>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b)
}

/// Value comparison with an identity fast path.
pub fn deep_equal<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// Boxed [`strict_equal`], the default change detector.
pub fn strict_equality<T: 'static>() -> EqualityFn<T> {
    Arc::new(strict_equal::<T>)
}

/// Boxed [`deep_equal`].
pub fn deep_equality<T: PartialEq + 'static>() -> EqualityFn<T> {
    Arc::new(deep_equal::<T>)
}
