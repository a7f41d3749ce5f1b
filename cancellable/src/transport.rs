//! Transport-side cancellation of in-flight requests.
//!
//! A promise can carry an opaque request handle issued by the transport
//! that started the underlying work. When the promise is cancelled it asks
//! the transport, through [`CancelTransport`], to abort that request. The
//! promise never inspects the handle; only the transport that issued it
//! knows what it means.

use futures::future::AbortHandle;

/// Cancels in-flight requests previously issued by this transport.
///
/// Implementations must tolerate cancellation of a request that already
/// completed, failed, or was cancelled before; a second cancellation of
/// the same request is a no-op, not an error.
pub trait CancelTransport: Send + Sync {
    /// Opaque per-request handle issued when work was started.
    type Request;

    /// Aborts the in-flight request identified by `request`.
    fn cancel_active_request(&self, request: &Self::Request);
}

/// Transport for futures made abortable with [`futures::future::Abortable`].
///
/// The request handle is the [`AbortHandle`] returned when the future was
/// wrapped; cancelling aborts the wrapped future at its next poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortTransport;

impl AbortTransport {
    /// Creates the abort-based transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CancelTransport for AbortTransport {
    type Request = AbortHandle;

    fn cancel_active_request(&self, request: &AbortHandle) {
        request.abort();
    }
}
