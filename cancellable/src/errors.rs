//! Error types for cancellable promises.
//!
//! The wrapper itself never raises: invalid cancels are silent no-ops and
//! underlying failures pass through the rejection channel unchanged. What
//! lives here is the default rejection type and the trait that manufactures
//! a cancellation rejection for consumer-supplied error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default rejection type for deferreds whose consumers do not carry a
/// domain-specific failure type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellableError {
    /// The operation was cancelled before it settled.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation failed with a plain message.
    #[error("operation failed: {0}")]
    Failed(String),
}

impl CancellableError {
    /// Creates a failure carrying the given message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns true if this rejection marks a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Rejection values that can represent a cancellation.
///
/// Cancelling a promise force-rejects the wrapped deferred, and a typed
/// rejection channel needs a concrete value to carry. Implement this for a
/// custom error type to make deferreds carrying it cancellable.
pub trait CancelRejection {
    /// The value injected into the rejection channel on cancel.
    fn cancelled() -> Self;
}

impl CancelRejection for CancellableError {
    fn cancelled() -> Self {
        Self::Cancelled
    }
}

impl CancelRejection for String {
    fn cancelled() -> Self {
        "operation cancelled".to_string()
    }
}
