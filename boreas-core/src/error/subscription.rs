//! Subscription registry errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription registry error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionError {
    /// The stream is already registered with another payload type.
    #[error("[Subscription] Stream '{stream}' carries {registered}, not {requested}")]
    TypeMismatch {
        /// Stream key.
        stream: String,
        /// Payload type the stream was created with.
        registered: String,
        /// Payload type of the rejected handler.
        requested: String,
    },
}

impl SubscriptionError {
    /// Returns the severity level of this error.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let error = SubscriptionError::TypeMismatch {
            stream: "btcusdt@depth5@1000ms".to_string(),
            registered: "PartialDepth".to_string(),
            requested: "Kline".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("PartialDepth"));
        assert!(text.contains("Kline"));
    }
}
