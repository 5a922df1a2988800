//! Lifecycle state errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An operation was issued in a state that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateError {
    /// The operation is not a valid transition from the current state.
    #[error("[State] Cannot {operation} while {from}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted operation.
        operation: String,
    },
}

impl StateError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Warning
    }

    /// Creates an invalid transition error.
    #[must_use]
    pub fn invalid(from: impl ToString, operation: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            operation: operation.into(),
        }
    }
}
