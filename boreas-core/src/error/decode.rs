//! Decode error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to decode a received message.
///
/// Always scoped to a single message: the message is logged and dropped,
/// later messages and other streams are unaffected.
///
/// ```
/// use boreas_core::error::DecodeError;
///
/// let error = DecodeError::Payload {
///     stream: "btcusdt@kline_1m".to_string(),
///     payload_type: "Kline".to_string(),
///     reason: "missing field `k`".to_string(),
/// };
/// assert!(error.to_string().contains("btcusdt@kline_1m"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeError {
    /// The combined-stream envelope could not be parsed.
    #[error("[Decode] Invalid envelope: {reason}")]
    Envelope {
        /// Parser error message.
        reason: String,
    },

    /// A multi-event payload carried no readable `e` field.
    #[error("[Decode] Payload on '{stream}' has no event type: {reason}")]
    EventType {
        /// Stream the payload arrived on.
        stream: String,
        /// Parser error message.
        reason: String,
    },

    /// The inner payload did not match the stream's registered type.
    #[error("[Decode] Payload for '{stream}' is not a valid {payload_type}: {reason}")]
    Payload {
        /// Stream the payload arrived on.
        stream: String,
        /// Registered payload type name.
        payload_type: String,
        /// Parser error message.
        reason: String,
    },
}

impl DecodeError {
    /// Decode errors are per message; the stream itself keeps working.
    #[must_use]
    pub fn severity(&self) -> super::ErrorSeverity {
        super::ErrorSeverity::Warning
    }

    /// Returns the stream name when the error is tied to one.
    #[must_use]
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Envelope { .. } => None,
            Self::EventType { stream, .. } | Self::Payload { stream, .. } => Some(stream),
        }
    }
}
