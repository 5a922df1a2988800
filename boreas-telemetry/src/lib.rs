//! # Boreas Telemetry
//!
//! Logging, tracing spans and metrics for the Boreas market-stream gateway.
//!
//! - **Structured Logging**: `tracing` with JSON or pretty stdout output and
//!   optional rolling log files
//! - **Metrics**: Prometheus-compatible counters, gauges and histograms for
//!   connections, rebuild cycles, message routing and rate-limit admission
//! - **Spans**: per-connection, per-rebuild and per-admission spans

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Span definitions for tracing
pub mod spans;

/// Metrics collection and export
pub mod metrics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, init_logging};
    pub use crate::metrics::{BoreasMetrics, MetricsConfig, init_metrics};
    pub use crate::spans::*;
}
