//! Error types and handling framework.
//!
//! Every failure the gateway can observe falls into one of a few categories:
//! - `NetworkError` - transport failures on a connection, recovered by the
//!   next rebuild cycle
//! - `DecodeError` - malformed envelope or payload, isolated per message
//! - `RateLimitError` - admission requests that can never be satisfied
//! - `StateError` - an operation issued in the wrong lifecycle state
//! - `SubscriptionError` - a stream registered under another payload type
//! - `ConfigError` - configuration loading and validation failures
//!
//! `BoreasError` wraps them all for callers that want a single type.
//!
//! ```
//! use boreas_core::error::{BoreasError, NetworkError};
//!
//! let error: BoreasError = NetworkError::Timeout { timeout_ms: 5000 }.into();
//! assert!(error.is_recoverable());
//! assert_eq!(error.category(), "network");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error severity levels for categorizing errors.
///
/// - `Fatal`: the operation can never succeed as issued
/// - `Recoverable`: retrying later (usually on the next cycle) may succeed
/// - `Warning`: the failure was contained and logged
/// - `Info`: an expected condition worth noting
///
/// ```
/// use boreas_core::error::ErrorSeverity;
///
/// let severity = ErrorSeverity::Recoverable;
/// assert!(severity.is_recoverable());
/// assert!(!severity.is_fatal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Unrecoverable error; the request itself is wrong.
    Fatal,

    /// Error that can be recovered from through retry or fallback.
    #[default]
    Recoverable,

    /// Contained failure that should be logged.
    Warning,

    /// Informational condition.
    Info,
}

impl ErrorSeverity {
    /// Returns true if this error is recoverable (not fatal).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Returns true if this error is fatal (unrecoverable).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }

    /// Returns the severity as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Recoverable => "RECOVERABLE",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

mod config;
mod decode;
mod network;
mod rate_limit;
mod state;
mod subscription;

pub use config::ConfigError;
pub use decode::DecodeError;
pub use network::NetworkError;
pub use rate_limit::RateLimitError;
pub use state::StateError;
pub use subscription::SubscriptionError;

/// Top-level error type for the Boreas gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoreasError {
    /// Transport error on a connection.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Envelope or payload decode error.
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// Rate limiter misuse.
    #[error("{0}")]
    RateLimit(#[from] RateLimitError),

    /// Operation issued in an invalid state.
    #[error("{0}")]
    State(#[from] StateError),

    /// Subscription registry error.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl BoreasError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(e) => e.severity(),
            Self::Decode(e) => e.severity(),
            Self::RateLimit(e) => e.severity(),
            Self::State(e) => e.severity(),
            Self::Subscription(e) => e.severity(),
            Self::Config(e) => e.severity(),
        }
    }

    /// Returns true if this error is recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.severity().is_recoverable()
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::RateLimit(_) => "rate_limit",
            Self::State(_) => "state",
            Self::Subscription(_) => "subscription",
            Self::Config(_) => "config",
        }
    }

    /// Returns the inner network error, if this is a network error.
    #[must_use]
    pub fn as_network_error(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized Result type for Boreas operations.
pub type Result<T> = std::result::Result<T, BoreasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_display() {
        assert_eq!(ErrorSeverity::Fatal.to_string(), "FATAL");
        assert_eq!(ErrorSeverity::Recoverable.to_string(), "RECOVERABLE");
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARNING");
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
    }

    #[test]
    fn test_network_error_conversion() {
        let network_err = NetworkError::Timeout { timeout_ms: 5000 };
        let err: BoreasError = network_err.clone().into();
        assert_eq!(err.category(), "network");
        assert_eq!(err.as_network_error(), Some(&network_err));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_capacity_misuse_is_fatal() {
        let err: BoreasError = RateLimitError::CapacityExceeded {
            window: "requests".to_string(),
            requested: 500,
            capacity: 120,
        }
        .into();
        assert_eq!(err.category(), "rate_limit");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_decode_error_is_contained() {
        let err: BoreasError = DecodeError::Envelope {
            reason: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.severity(), ErrorSeverity::Warning);
        assert!(err.as_network_error().is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = BoreasError::State(StateError::InvalidTransition {
            from: "Connected".to_string(),
            operation: "connect".to_string(),
        });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: BoreasError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }

    #[test]
    fn test_display() {
        let err = BoreasError::Network(NetworkError::Timeout { timeout_ms: 5000 });
        assert!(format!("{err}").contains("5000ms"));
    }
}
