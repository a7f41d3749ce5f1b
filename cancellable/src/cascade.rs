//! Cascade membership for grouped cancellation.

use std::sync::Arc;

/// An operation that can be cancelled as part of a cascade.
///
/// A promise cancels every member of its cascade when it is itself
/// cancelled. Implementations must be idempotent: a member may sit in
/// several cascades, or be cancelled directly, and only the first call may
/// have an effect.
pub trait Cancellable: Send + Sync {
    /// Requests cooperative cancellation.
    fn cancel(&self);
}

impl<C: Cancellable + ?Sized> Cancellable for Arc<C> {
    fn cancel(&self) {
        (**self).cancel();
    }
}
