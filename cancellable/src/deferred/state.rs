//! Settlement state of a deferred computation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The settlement state of a [`Deferred`](super::Deferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    /// Not yet settled.
    Pending,
    /// Settled with a resolution value.
    Resolved,
    /// Settled with a rejection error.
    Rejected,
}

impl Default for PromiseState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl PromiseState {
    /// Returns true if the deferred has settled, in either direction.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the deferred settled with a value.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Returns true if the deferred settled with an error.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PromiseState::Pending.to_string(), "pending");
        assert_eq!(PromiseState::Resolved.to_string(), "resolved");
        assert_eq!(PromiseState::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_state_is_settled() {
        assert!(!PromiseState::Pending.is_settled());
        assert!(PromiseState::Resolved.is_settled());
        assert!(PromiseState::Rejected.is_settled());
    }

    #[test]
    fn test_state_default_is_pending() {
        assert_eq!(PromiseState::default(), PromiseState::Pending);
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_string(&PromiseState::Pending).unwrap();
        assert_eq!(json, r#""pending""#);

        let deserialized: PromiseState = serde_json::from_str(r#""rejected""#).unwrap();
        assert_eq!(deserialized, PromiseState::Rejected);
    }
}
