//! Boreas metrics recorder with pre-defined metrics.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Why a connection left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// No frame received within the watchdog timeout
    Watchdog,
    /// Receive loop already ended
    Dead,
    /// Exceeded the maximum connection age
    Aged,
    /// Folded into a fresh batch during repacking
    Repacked,
    /// Explicit shutdown
    Shutdown,
}

impl CloseReason {
    /// Returns the label value for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Watchdog => "watchdog",
            Self::Dead => "dead",
            Self::Aged => "aged",
            Self::Repacked => "repacked",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Pre-defined metrics for the Boreas gateway.
///
/// All metrics follow the naming convention: `boreas_<category>_<metric>_<unit>`
pub struct BoreasMetrics;

impl BoreasMetrics {
    /// Register all metric descriptions.
    pub fn register() {
        // Message routing
        describe_counter!(
            "boreas_stream_messages_received_total",
            "Messages delivered to a registered stream"
        );
        describe_counter!(
            "boreas_stream_decode_failures_total",
            "Messages dropped because the envelope or payload did not decode"
        );
        describe_counter!(
            "boreas_stream_unknown_total",
            "Messages dropped because their stream is not registered"
        );

        // Connections
        describe_counter!(
            "boreas_connection_opened_total",
            "Connections successfully opened"
        );
        describe_counter!(
            "boreas_connection_closed_total",
            "Connections removed from the active set"
        );
        describe_counter!(
            "boreas_connection_failures_total",
            "Connection attempts that failed"
        );
        describe_gauge!("boreas_connection_active", "Connections in the active set");

        // Rebuild cycle
        describe_counter!("boreas_rebuild_cycles_total", "Rebuild cycles run");
        describe_histogram!(
            "boreas_rebuild_duration_seconds",
            "Wall time spent in one rebuild cycle"
        );

        // Rate limiting
        describe_counter!(
            "boreas_rate_limit_admitted_total",
            "Units admitted by the rate limiter"
        );
        describe_histogram!(
            "boreas_rate_limit_wait_seconds",
            "Time callers waited for admission"
        );
    }

    // ==================== Message Routing ====================

    /// Record a message delivered to a stream.
    pub fn message_received(stream: &str) {
        counter!(
            "boreas_stream_messages_received_total",
            "stream" => stream.to_string()
        )
        .increment(1);
    }

    /// Record a message that failed to decode.
    pub fn decode_failure(stage: &str) {
        counter!(
            "boreas_stream_decode_failures_total",
            "stage" => stage.to_string()
        )
        .increment(1);
    }

    /// Record a message for an unregistered stream.
    pub fn unknown_stream() {
        counter!("boreas_stream_unknown_total").increment(1);
    }

    // ==================== Connections ====================

    /// Record a successfully opened connection.
    pub fn connection_opened() {
        counter!("boreas_connection_opened_total").increment(1);
    }

    /// Record a connection leaving the active set.
    pub fn connection_closed(reason: CloseReason) {
        counter!(
            "boreas_connection_closed_total",
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    /// Record a failed connection attempt.
    pub fn connection_failed() {
        counter!("boreas_connection_failures_total").increment(1);
    }

    /// Update the active connections gauge.
    #[allow(clippy::cast_precision_loss)]
    pub fn active_connections(count: usize) {
        gauge!("boreas_connection_active").set(count as f64);
    }

    // ==================== Rebuild Cycle ====================

    /// Record a completed rebuild cycle.
    pub fn rebuild_cycle(outcome: &str, duration_seconds: f64) {
        counter!(
            "boreas_rebuild_cycles_total",
            "outcome" => outcome.to_string()
        )
        .increment(1);
        histogram!("boreas_rebuild_duration_seconds").record(duration_seconds);
    }

    // ==================== Rate Limiting ====================

    /// Record an admission and how long it waited.
    pub fn rate_limit_admitted(window: &'static str, weight: u32, wait_seconds: f64) {
        counter!("boreas_rate_limit_admitted_total", "window" => window)
            .increment(u64::from(weight));
        histogram!("boreas_rate_limit_wait_seconds", "window" => window).record(wait_seconds);
    }
}
