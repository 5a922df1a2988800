//! Network-related error types.
//!
//! Transport failures observed on a single connection. None of them reach
//! stream subscribers; the multiplexer recovers by reopening on its next cycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network error type covering connection failures, timeouts and WebSocket errors.
///
/// # Examples
///
/// ```
/// use boreas_core::error::NetworkError;
///
/// let error = NetworkError::ConnectionFailed {
///     reason: "Connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("Connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to remote host failed.
    #[error("[Network] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connection timed out.
    #[error("[Network] Connection timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// WebSocket protocol error occurred.
    #[error("[Network] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// Connection was closed unexpectedly.
    #[error("[Network] Connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the connection closure.
        reason: String,
    },

    /// Incoming message exceeded the receive buffer.
    #[error("[Network] Message of {size} bytes exceeds receive buffer of {limit} bytes")]
    MessageTooLarge {
        /// Size of the offending message.
        size: usize,
        /// Configured receive buffer size.
        limit: usize,
    },

    /// Endpoint could not be used to open a connection.
    #[error("[Network] Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The offending endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl NetworkError {
    /// Returns true if this error is recoverable (can be retried).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidEndpoint { .. })
    }

    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        use super::ErrorSeverity;
        match self {
            Self::InvalidEndpoint { .. } => ErrorSeverity::Fatal,
            Self::Timeout { .. }
            | Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::MessageTooLarge { .. } => ErrorSeverity::Recoverable,
        }
    }

    /// Returns a suggested retry delay in milliseconds, if applicable.
    #[must_use]
    pub fn suggested_retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::Timeout { timeout_ms } => Some(*timeout_ms / 2),
            Self::ConnectionFailed { .. } | Self::ConnectionClosed { .. } => Some(1000),
            Self::WebSocket { .. } | Self::MessageTooLarge { .. } => Some(500),
            Self::InvalidEndpoint { .. } => None,
        }
    }
}
