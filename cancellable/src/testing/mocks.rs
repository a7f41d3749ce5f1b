//! Mock transports and cascade members for testing.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cascade::Cancellable;
use crate::transport::CancelTransport;

/// A mock transport that records every request it is asked to abort.
pub struct RecordingTransport<R> {
    cancelled: Mutex<Vec<R>>,
}

impl<R> RecordingTransport<R> {
    /// Creates a transport with no recorded aborts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of abort requests received.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().len()
    }

    /// Resets abort tracking.
    pub fn reset(&self) {
        self.cancelled.lock().clear();
    }
}

impl<R: Clone> RecordingTransport<R> {
    /// Returns the aborted requests in the order they were received.
    #[must_use]
    pub fn cancelled_requests(&self) -> Vec<R> {
        self.cancelled.lock().clone()
    }
}

impl<R> Default for RecordingTransport<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for RecordingTransport<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("cancel_count", &self.cancel_count())
            .finish()
    }
}

impl<R: Clone + Send + Sync> CancelTransport for RecordingTransport<R> {
    type Request = R;

    fn cancel_active_request(&self, request: &R) {
        self.cancelled.lock().push(request.clone());
    }
}

/// A cascade member that counts how many times it was cancelled.
#[derive(Debug, Default)]
pub struct CountingCancellable {
    cancels: AtomicUsize,
}

impl CountingCancellable {
    /// Creates a member with no cancellations recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times `cancel` was called.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Cancellable for CountingCancellable {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// A cascade member that ignores cancellation entirely.
///
/// Stands in for collaborators that have nothing to tear down.
#[derive(Debug, Clone, Copy, Default)]
pub struct InertCancellable;

impl InertCancellable {
    /// Creates the inert member.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Cancellable for InertCancellable {
    fn cancel(&self) {
        // Intentionally empty.
    }
}
