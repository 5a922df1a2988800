//! Rate limiter error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rate limiter misuse.
///
/// Admission never fails for lack of capacity, it only waits. The one
/// exception is a request that no amount of waiting could ever admit.
///
/// ```
/// use boreas_core::error::RateLimitError;
///
/// let error = RateLimitError::CapacityExceeded {
///     window: "requests".to_string(),
///     requested: 300,
///     capacity: 120,
/// };
/// assert!(error.to_string().contains("300"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateLimitError {
    /// Requested weight is larger than the window can ever hold.
    #[error("[RateLimit] Weight {requested} exceeds {window} window capacity of {capacity}")]
    CapacityExceeded {
        /// Which window rejected the request.
        window: String,
        /// Requested weight.
        requested: u32,
        /// Capacity of the window.
        capacity: u32,
    },
}

impl RateLimitError {
    /// Capacity misuse is a caller bug and never resolves by retrying.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Fatal
    }
}
