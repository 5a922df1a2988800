//! Span definitions for tracing.
//!
//! - connection lifetime
//! - rebuild cycles
//! - rate limiter admission

use tracing::{Span, info_span};

/// Create a span covering one connection's receive loop.
///
/// # Example
///
/// ```
/// use boreas_telemetry::spans::connection_span;
///
/// let span = connection_span(7, 3);
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn connection_span(connection_id: u64, stream_count: usize) -> Span {
    info_span!(
        "connection",
        connection.id = connection_id,
        streams = stream_count,
        otel.kind = "client"
    )
}

/// Create a span for one rebuild cycle.
#[must_use]
pub fn rebuild_span(cycle: u64) -> Span {
    info_span!("rebuild", cycle = cycle)
}

/// Create a span for a rate limiter admission.
///
/// # Example
///
/// ```
/// use boreas_telemetry::spans::admission_span;
///
/// let span = admission_span("requests", 5);
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn admission_span(window: &str, weight: u32) -> Span {
    info_span!("admission", window = %window, weight = weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    fn init_test_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    }

    #[test]
    fn test_connection_span() {
        init_test_subscriber();
        let span = connection_span(1, 10);
        let _guard = span.enter();
    }

    #[test]
    fn test_rebuild_span() {
        init_test_subscriber();
        let span = rebuild_span(42);
        let _guard = span.enter();
    }

    #[test]
    fn test_admission_span() {
        init_test_subscriber();
        let span = admission_span("orders", 1);
        let _guard = span.enter();
    }
}
