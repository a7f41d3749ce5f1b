//! Cancellable promises over a shared deferred computation.
//!
//! A [`CancellablePromise`] wraps a [`Deferred`] and layers cancellation on
//! top of it: [`cancel`](CancellablePromise::cancel) force-rejects the
//! underlying computation, asks the issuing transport to abort its in-flight
//! request, cancels every cascade member, and drains the registered cancel
//! callbacks. [`prevent_cancel`](CancellablePromise::prevent_cancel)
//! permanently disarms all of that.
//!
//! Cancellation is a one-way race: the first of `cancel` and
//! `prevent_cancel` to run wins, and every later attempt in either
//! direction is a no-op. A promise whose underlying computation already
//! settled can no longer be cancelled at all.
//!
//! Attachment methods ([`done`](CancellablePromise::done),
//! [`fail`](CancellablePromise::fail), [`always`](CancellablePromise::always),
//! [`then`](CancellablePromise::then), [`pipe`](CancellablePromise::pipe),
//! [`progress`](CancellablePromise::progress)) forward to the underlying
//! deferred and return `&Self` so calls chain:
//!
//! ```
//! use cancellable::prelude::*;
//!
//! let promise: CancellablePromise<u32> = CancellablePromise::new();
//! promise
//!     .done(|value| println!("got {value}"))
//!     .fail(|error| eprintln!("failed: {error}"))
//!     .on_cancel(|| println!("gave up"));
//!
//! promise.cancel();
//! assert!(promise.is_cancelled());
//! ```

mod phase;


pub use phase::CancelPhase;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cascade::Cancellable;
use crate::deferred::{Deferred, Outcome, PromiseState};
use crate::errors::{CancelRejection, CancellableError};
use crate::transport::CancelTransport;

/// Zero-argument callback run when the promise is cancelled.
type CancelCallback = Box<dyn FnOnce() + Send>;
/// Erased transport abort, bound to one request at registration time.
type TransportAbort = Box<dyn FnOnce() + Send>;

/// Cancellation state behind one lock: the phase plus everything that
/// gets consumed when the promise cancels.
#[derive(Default)]
struct CancelSlot {
    phase: CancelPhase,
    transport: Option<TransportAbort>,
    cascade: Vec<Box<dyn Cancellable>>,
    callbacks: Vec<CancelCallback>,
}

struct PromiseInner<T, E, P> {
    id: Uuid,
    underlying: Deferred<T, E, P>,
    cancel: Mutex<CancelSlot>,
}

/// A promise that can be cancelled as long as it is still pending.
///
/// Cheap to clone; clones share the underlying deferred and the
/// cancellation state, so cancelling through any clone cancels them all.
pub struct CancellablePromise<T, E = CancellableError, P = ()> {
    inner: Arc<PromiseInner<T, E, P>>,
}

impl<T, E, P> Clone for CancellablePromise<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E, P> Default for CancellablePromise<T, E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, P> fmt::Debug for CancellablePromise<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellablePromise")
            .field("id", &self.inner.id)
            .field("phase", &self.phase())
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E, P> CancellablePromise<T, E, P> {
    /// Creates a cancellable promise over a fresh pending deferred.
    #[must_use]
    pub fn new() -> Self {
        Self::from_deferred(Deferred::new())
    }

    /// Wraps an existing deferred, typically one the producer side keeps a
    /// clone of to settle later.
    #[must_use]
    pub fn from_deferred(underlying: Deferred<T, E, P>) -> Self {
        Self {
            inner: Arc::new(PromiseInner {
                id: Uuid::new_v4(),
                underlying,
                cancel: Mutex::new(CancelSlot::default()),
            }),
        }
    }

    /// Registers the transport request to abort on cancellation.
    ///
    /// The transport is asked to abort at most once, before the rejection
    /// callbacks of the underlying deferred run. If the promise is already
    /// cancelled the abort runs immediately.
    #[must_use]
    pub fn with_transport<C>(self, transport: Arc<C>, request: C::Request) -> Self
    where
        C: CancelTransport + 'static,
        C::Request: Send + 'static,
    {
        let abort: TransportAbort =
            Box::new(move || transport.cancel_active_request(&request));
        let run_now = {
            let mut slot = self.inner.cancel.lock();
            if slot.phase.is_cancelled() {
                Some(abort)
            } else {
                slot.transport = Some(abort);
                None
            }
        };
        if let Some(abort) = run_now {
            abort();
        }
        self
    }

    /// Adds one member to the cancellation cascade.
    ///
    /// Cascade members are cancelled, in registration order, right after the
    /// rejection callbacks of the underlying deferred run. A member added
    /// after the promise cancelled is cancelled immediately.
    #[must_use]
    pub fn with_cascade_member(self, member: impl Cancellable + 'static) -> Self {
        let run_now = {
            let mut slot = self.inner.cancel.lock();
            if slot.phase.is_cancelled() {
                Some(member)
            } else {
                slot.cascade.push(Box::new(member));
                None
            }
        };
        if let Some(member) = run_now {
            member.cancel();
        }
        self
    }

    /// Adds several members to the cancellation cascade at once.
    #[must_use]
    pub fn with_cascade(self, members: Vec<Box<dyn Cancellable>>) -> Self {
        let run_now = {
            let mut slot = self.inner.cancel.lock();
            if slot.phase.is_cancelled() {
                Some(members)
            } else {
                slot.cascade.extend(members);
                None
            }
        };
        if let Some(members) = run_now {
            for member in &members {
                member.cancel();
            }
        }
        self
    }

    /// Unique identifier of this promise, shared by all clones.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// A clone of the underlying deferred, for the producer side to settle.
    #[must_use]
    pub fn deferred(&self) -> Deferred<T, E, P> {
        self.inner.underlying.clone()
    }

    /// Current cancellation phase.
    #[must_use]
    pub fn phase(&self) -> CancelPhase {
        self.inner.cancel.lock().phase
    }

    /// Returns true once the promise has been cancelled. Never reverts.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.phase().is_cancelled()
    }

    /// Returns true once cancellation has been disabled. Never reverts.
    #[must_use]
    pub fn is_cancel_prevented(&self) -> bool {
        self.phase().is_prevented()
    }

    /// Settlement state of the underlying deferred.
    #[must_use]
    pub fn state(&self) -> PromiseState {
        self.inner.underlying.state()
    }

    /// Permanently disables cancellation.
    ///
    /// Later [`cancel`](Self::cancel) calls become no-ops. Has no effect if
    /// the promise already cancelled.
    pub fn prevent_cancel(&self) -> &Self {
        let moved = self.inner.cancel.lock().phase.try_prevent();
        if moved {
            debug!(promise_id = %self.inner.id, "cancellation prevented");
        }
        self
    }

    /// Registers a callback to run when the promise is cancelled.
    ///
    /// Callbacks run in registration order during cancellation, each removed
    /// from the registry before it is invoked. If the promise is already
    /// cancelled the callback runs synchronously before this returns.
    pub fn on_cancel<F>(&self, callback: F) -> &Self
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut slot = self.inner.cancel.lock();
            if !slot.phase.is_cancelled() {
                slot.callbacks.push(Box::new(callback));
                return self;
            }
        }
        invoke_cancel_callback(Box::new(callback), self.inner.id);
        self
    }

    /// Attaches a resolution callback to the underlying deferred.
    pub fn done<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.inner.underlying.done(callback);
        self
    }

    /// Attaches a rejection callback to the underlying deferred.
    ///
    /// Cancellation force-rejects the deferred, so this also observes
    /// cancellation.
    pub fn fail<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.inner.underlying.fail(callback);
        self
    }

    /// Attaches a completion callback to the underlying deferred.
    pub fn always<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Result<&T, &E>) + Send + 'static,
    {
        self.inner.underlying.always(callback);
        self
    }

    /// Attaches a progress callback to the underlying deferred.
    pub fn progress<F>(&self, callback: F) -> &Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.inner.underlying.progress(callback);
        self
    }

    /// Attaches a resolution and a rejection callback in one call.
    pub fn then<D, F>(&self, on_resolve: D, on_reject: F) -> &Self
    where
        D: FnOnce(&T) + Send + 'static,
        F: FnOnce(&E) + Send + 'static,
    {
        self.inner.underlying.then(on_resolve, on_reject);
        self
    }

    /// Alias of [`then`](Self::then) kept for callers used to pipe-style
    /// chaining.
    pub fn pipe<D, F>(&self, on_resolve: D, on_reject: F) -> &Self
    where
        D: FnOnce(&T) + Send + 'static,
        F: FnOnce(&E) + Send + 'static,
    {
        self.then(on_resolve, on_reject)
    }

    /// Returns the settlement of the underlying deferred, if any.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.underlying.try_outcome()
    }

    /// Waits until the underlying deferred settles and returns its outcome.
    pub async fn outcome(&self) -> Outcome<T, E> {
        self.inner.underlying.outcome().await
    }

    /// Waits until the underlying deferred settles and returns the final
    /// state tag.
    pub async fn settled(&self) -> PromiseState {
        self.inner.underlying.settled().await
    }
}

impl<T, E, P> CancellablePromise<T, E, P>
where
    E: CancelRejection,
{
    /// Cancels the promise.
    ///
    /// The rejection of the underlying deferred is claimed first,
    /// atomically: cancellation proceeds only if the deferred is still
    /// pending at that instant, so a settle racing in from another thread
    /// leaves this call a complete no-op. A successful cancel then runs, in
    /// order: the transport abort for the registered request, the deferred's
    /// rejection-side callbacks (carrying [`CancelRejection::cancelled`]),
    /// cancellation of every cascade member, and the cancel callbacks in
    /// registration order. Each cancel callback is removed from the registry
    /// before it runs, so a re-entrant `cancel` sees nothing left to do.
    ///
    /// A no-op if the promise already cancelled, cancellation was prevented,
    /// or the underlying deferred already settled.
    pub fn cancel(&self) -> &Self {
        let (rejection, transport, cascade, callbacks) = {
            let mut slot = self.inner.cancel.lock();
            if !slot.phase.is_armed() {
                debug!(promise_id = %self.inner.id, "cancel ignored");
                return self;
            }
            let Some(rejection) = self.inner.underlying.claim_rejection(E::cancelled()) else {
                debug!(promise_id = %self.inner.id, "cancel ignored");
                return self;
            };
            slot.phase.try_cancel();
            (
                rejection,
                slot.transport.take(),
                std::mem::take(&mut slot.cascade),
                std::mem::take(&mut slot.callbacks),
            )
        };
        debug!(
            promise_id = %self.inner.id,
            cascade = cascade.len(),
            callbacks = callbacks.len(),
            "cancelling promise"
        );
        if let Some(abort) = transport {
            abort();
        }
        rejection.finish();
        for member in &cascade {
            member.cancel();
        }
        for callback in callbacks {
            invoke_cancel_callback(callback, self.inner.id);
        }
        self
    }
}

impl<T, E, P> Cancellable for CancellablePromise<T, E, P>
where
    T: Send + Sync,
    E: CancelRejection + Send + Sync,
    P: Send + Sync,
{
    fn cancel(&self) {
        CancellablePromise::cancel(self);
    }
}

fn invoke_cancel_callback(callback: CancelCallback, promise_id: Uuid) {
    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!(promise_id = %promise_id, "Cancel callback panicked: {:?}", panic);
    }
}
