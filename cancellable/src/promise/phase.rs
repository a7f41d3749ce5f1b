//! Cancellation lifecycle of a promise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a promise stands in its cancellation lifecycle.
///
/// Every promise starts [`Armed`](CancelPhase::Armed). From there exactly
/// one transition can happen: to [`Prevented`](CancelPhase::Prevented) or
/// to [`Cancelled`](CancelPhase::Cancelled). Both are terminal, so whoever
/// moves first wins and later attempts in either direction change nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPhase {
    /// Cancellation is still possible.
    Armed,
    /// Cancellation has been permanently disabled.
    Prevented,
    /// The promise has been cancelled.
    Cancelled,
}

impl Default for CancelPhase {
    fn default() -> Self {
        Self::Armed
    }
}

impl fmt::Display for CancelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armed => write!(f, "armed"),
            Self::Prevented => write!(f, "prevented"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl CancelPhase {
    /// Returns true while cancellation remains possible.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed)
    }

    /// Returns true if cancellation has been permanently disabled.
    #[must_use]
    pub fn is_prevented(&self) -> bool {
        matches!(self, Self::Prevented)
    }

    /// Returns true if the promise has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Moves to `Prevented` if still armed. Returns whether it moved.
    pub(crate) fn try_prevent(&mut self) -> bool {
        if self.is_armed() {
            *self = Self::Prevented;
            true
        } else {
            false
        }
    }

    /// Moves to `Cancelled` if still armed. Returns whether it moved.
    pub(crate) fn try_cancel(&mut self) -> bool {
        if self.is_armed() {
            *self = Self::Cancelled;
            true
        } else {
            false
        }
    }
}
