//! The underlying computation handle wrapped by cancellable promises.
//!
//! A [`Deferred`] represents a future result that settles at most once,
//! into either a resolution value or a rejection error. Consumers observe
//! the result by attaching callbacks:
//!
//! - [`done`](Deferred::done): runs on resolution
//! - [`fail`](Deferred::fail): runs on rejection
//! - [`always`](Deferred::always): runs on either settlement
//! - [`progress`](Deferred::progress): runs on every progress update while
//!   pending
//!
//! Callbacks attached after settlement run synchronously and immediately
//! with the stored outcome; callbacks on the arm that did not occur are
//! discarded. Within one kind, callbacks run in registration order, and
//! resolution/rejection callbacks run before completion callbacks.
//!
//! Async code can bridge in with [`settled`](Deferred::settled) or
//! [`outcome`](Deferred::outcome) instead of attaching callbacks.

mod state;

mod deferred_tests;

pub use state::PromiseState;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

use crate::errors::CancellableError;

/// Callback invoked once with the resolution value.
type DoneCallback<T> = Box<dyn FnOnce(&T) + Send>;
/// Callback invoked once with the rejection error.
type FailCallback<E> = Box<dyn FnOnce(&E) + Send>;
/// Callback invoked once with the settlement, whichever arm it took.
type AlwaysCallback<T, E> = Box<dyn FnOnce(Result<&T, &E>) + Send>;
/// Callback invoked on every progress update while pending.
type ProgressCallback<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// The stored settlement of a deferred.
pub type Outcome<T, E> = Result<Arc<T>, Arc<E>>;

/// Callback lists and settlement storage behind one lock.
struct Slots<T, E, P> {
    outcome: Option<Outcome<T, E>>,
    done: Vec<DoneCallback<T>>,
    fail: Vec<FailCallback<E>>,
    always: Vec<AlwaysCallback<T, E>>,
    progress: Vec<ProgressCallback<P>>,
    last_progress: Option<Arc<P>>,
}

impl<T, E, P> Default for Slots<T, E, P> {
    fn default() -> Self {
        Self {
            outcome: None,
            done: Vec::new(),
            fail: Vec::new(),
            always: Vec::new(),
            progress: Vec::new(),
            last_progress: None,
        }
    }
}

struct DeferredInner<T, E, P> {
    slots: Mutex<Slots<T, E, P>>,
    /// Wakes async waiters exactly when the outcome is written.
    settled: Notify,
}

/// A settle-once asynchronous computation handle with callback attachment.
///
/// The handle is cheap to clone; clones share one settlement. The producer
/// side keeps a clone and calls [`resolve`](Self::resolve),
/// [`reject`](Self::reject) and [`notify`](Self::notify); consumers attach
/// callbacks or await [`outcome`](Self::outcome).
pub struct Deferred<T, E = CancellableError, P = ()> {
    inner: Arc<DeferredInner<T, E, P>>,
}

impl<T, E, P> Clone for Deferred<T, E, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E, P> Default for Deferred<T, E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, P> fmt::Debug for Deferred<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E, P> Deferred<T, E, P> {
    /// Creates a pending deferred with no callbacks attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DeferredInner {
                slots: Mutex::new(Slots::default()),
                settled: Notify::new(),
            }),
        }
    }

    /// Returns the current settlement state.
    #[must_use]
    pub fn state(&self) -> PromiseState {
        match self.inner.slots.lock().outcome {
            None => PromiseState::Pending,
            Some(Ok(_)) => PromiseState::Resolved,
            Some(Err(_)) => PromiseState::Rejected,
        }
    }

    /// Returns the settlement if one has been stored.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.slots.lock().outcome.clone()
    }

    /// Settles the deferred with a resolution value.
    ///
    /// Drains the `done` callbacks and then the `always` callbacks in
    /// registration order; `fail` callbacks are discarded. Returns `false`
    /// without any other effect if the deferred already settled.
    pub fn resolve(&self, value: T) -> bool {
        let (value, done, always) = {
            let mut slots = self.inner.slots.lock();
            if slots.outcome.is_some() {
                return false;
            }
            let value = Arc::new(value);
            slots.outcome = Some(Ok(Arc::clone(&value)));
            slots.fail.clear();
            slots.progress.clear();
            slots.last_progress = None;
            (
                value,
                std::mem::take(&mut slots.done),
                std::mem::take(&mut slots.always),
            )
        };
        self.inner.settled.notify_waiters();
        for callback in done {
            invoke_done(callback, &value);
        }
        for callback in always {
            invoke_always(callback, Ok(&*value));
        }
        true
    }

    /// Settles the deferred with a rejection error.
    ///
    /// Drains the `fail` callbacks and then the `always` callbacks in
    /// registration order; `done` callbacks are discarded. Returns `false`
    /// without any other effect if the deferred already settled.
    pub fn reject(&self, error: E) -> bool {
        match self.claim_rejection(error) {
            Some(claimed) => {
                claimed.finish();
                true
            }
            None => false,
        }
    }

    /// Writes a rejection outcome without running any callbacks.
    ///
    /// The claim is atomic with respect to competing settles: exactly one
    /// claimer or settler wins. The returned [`ClaimedRejection`] carries
    /// the drained rejection-side callbacks; the caller invokes
    /// [`ClaimedRejection::finish`] once it holds no locks of its own.
    /// Returns `None` if the deferred already settled.
    pub(crate) fn claim_rejection(&self, error: E) -> Option<ClaimedRejection<T, E, P>> {
        let mut slots = self.inner.slots.lock();
        if slots.outcome.is_some() {
            return None;
        }
        let error = Arc::new(error);
        slots.outcome = Some(Err(Arc::clone(&error)));
        slots.done.clear();
        slots.progress.clear();
        slots.last_progress = None;
        Some(ClaimedRejection {
            deferred: self.clone(),
            error,
            fail: std::mem::take(&mut slots.fail),
            always: std::mem::take(&mut slots.always),
        })
    }

    /// Publishes a progress update to every progress callback.
    ///
    /// The update is retained, so a progress callback attached later (while
    /// still pending) replays the most recent update. Returns `false`
    /// without notifying anyone once the deferred has settled.
    pub fn notify(&self, update: P) -> bool {
        let (update, callbacks) = {
            let mut slots = self.inner.slots.lock();
            if slots.outcome.is_some() {
                return false;
            }
            let update = Arc::new(update);
            slots.last_progress = Some(Arc::clone(&update));
            (update, slots.progress.clone())
        };
        for callback in &callbacks {
            invoke_progress(callback, &update);
        }
        true
    }

    /// Attaches a resolution callback.
    ///
    /// Runs synchronously and immediately if the deferred is already
    /// resolved; is discarded if it is already rejected.
    pub fn done<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let run_with;
        {
            let mut slots = self.inner.slots.lock();
            match slots.outcome.as_ref() {
                None => {
                    slots.done.push(Box::new(callback));
                    return self;
                }
                Some(Ok(value)) => run_with = Some(Arc::clone(value)),
                Some(Err(_)) => run_with = None,
            }
        }
        if let Some(value) = run_with {
            invoke_done(Box::new(callback), &value);
        }
        self
    }

    /// Attaches a rejection callback.
    ///
    /// Runs synchronously and immediately if the deferred is already
    /// rejected; is discarded if it is already resolved.
    pub fn fail<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        let run_with;
        {
            let mut slots = self.inner.slots.lock();
            match slots.outcome.as_ref() {
                None => {
                    slots.fail.push(Box::new(callback));
                    return self;
                }
                Some(Err(error)) => run_with = Some(Arc::clone(error)),
                Some(Ok(_)) => run_with = None,
            }
        }
        if let Some(error) = run_with {
            invoke_fail(Box::new(callback), &error);
        }
        self
    }

    /// Attaches a completion callback that runs on either settlement.
    ///
    /// Runs synchronously and immediately if the deferred already settled.
    pub fn always<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Result<&T, &E>) + Send + 'static,
    {
        let outcome;
        {
            let mut slots = self.inner.slots.lock();
            match slots.outcome.as_ref() {
                None => {
                    slots.always.push(Box::new(callback));
                    return self;
                }
                Some(stored) => outcome = stored.clone(),
            }
        }
        invoke_always(
            Box::new(callback),
            outcome.as_ref().map(|value| &**value).map_err(|error| &**error),
        );
        self
    }

    /// Attaches a progress callback.
    ///
    /// While pending, replays the most recent update (if any) synchronously
    /// and immediately. Registers nothing once the deferred has settled.
    pub fn progress<F>(&self, callback: F) -> &Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let (stored, replay) = {
            let mut slots = self.inner.slots.lock();
            if slots.outcome.is_some() {
                return self;
            }
            let stored: ProgressCallback<P> = Arc::new(callback);
            slots.progress.push(Arc::clone(&stored));
            (stored, slots.last_progress.clone())
        };
        if let Some(update) = replay {
            invoke_progress(&stored, &update);
        }
        self
    }

    /// Attaches a resolution callback and a rejection callback in one call.
    pub fn then<D, F>(&self, on_resolve: D, on_reject: F) -> &Self
    where
        D: FnOnce(&T) + Send + 'static,
        F: FnOnce(&E) + Send + 'static,
    {
        self.done(on_resolve).fail(on_reject)
    }

    /// Waits until the deferred settles and returns the stored outcome.
    ///
    /// Returns immediately if it already settled.
    pub async fn outcome(&self) -> Outcome<T, E> {
        loop {
            let notified = self.inner.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.try_outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// Waits until the deferred settles and returns the final state tag.
    pub async fn settled(&self) -> PromiseState {
        match self.outcome().await {
            Ok(_) => PromiseState::Resolved,
            Err(_) => PromiseState::Rejected,
        }
    }
}

/// A rejection that has been written while its observer callbacks are
/// still pending invocation.
pub(crate) struct ClaimedRejection<T, E, P> {
    deferred: Deferred<T, E, P>,
    error: Arc<E>,
    fail: Vec<FailCallback<E>>,
    always: Vec<AlwaysCallback<T, E>>,
}

impl<T, E, P> ClaimedRejection<T, E, P> {
    /// Wakes async waiters and drains the rejection-side callbacks.
    ///
    /// Must be called outside any lock; callbacks run synchronously here.
    pub(crate) fn finish(self) {
        let Self {
            deferred,
            error,
            fail,
            always,
        } = self;
        deferred.inner.settled.notify_waiters();
        for callback in fail {
            invoke_fail(callback, &error);
        }
        for callback in always {
            invoke_always(callback, Err(&*error));
        }
    }
}

fn invoke_done<T>(callback: DoneCallback<T>, value: &T) {
    if let Err(panic) =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(value)))
    {
        warn!("Done callback panicked: {:?}", panic);
    }
}

fn invoke_fail<E>(callback: FailCallback<E>, error: &E) {
    if let Err(panic) =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(error)))
    {
        warn!("Fail callback panicked: {:?}", panic);
    }
}

fn invoke_always<T, E>(callback: AlwaysCallback<T, E>, outcome: Result<&T, &E>) {
    if let Err(panic) =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(outcome)))
    {
        warn!("Always callback panicked: {:?}", panic);
    }
}

fn invoke_progress<P>(callback: &ProgressCallback<P>, update: &P) {
    if let Err(panic) =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(update)))
    {
        warn!("Progress callback panicked: {:?}", panic);
    }
}
