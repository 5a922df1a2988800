//! Metrics collection and export for Boreas.
//!
//! Prometheus-compatible metrics for:
//! - message routing (received, decode failures, unknown streams)
//! - connection lifecycle and rebuild cycles
//! - rate limiter admissions and wait time

mod config;
mod recorder;

pub use config::MetricsConfig;
pub use recorder::{BoreasMetrics, CloseReason};

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics system with the given configuration.
///
/// With `expose_endpoint` the exporter serves `/metrics` itself and
/// [`render_metrics`] stays empty. Must be called from within a Tokio
/// runtime in that case.
///
/// # Example
///
/// ```no_run
/// use boreas_telemetry::metrics::{init_metrics, MetricsConfig};
///
/// init_metrics(&MetricsConfig::default()).expect("Failed to initialize metrics");
/// ```
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| MetricsError::InitializationFailed(e.to_string()))?;

    if config.expose_endpoint {
        let addr: SocketAddr = config
            .endpoint_address
            .parse()
            .map_err(|e| MetricsError::InvalidAddress(format!("{e}")))?;
        builder
            .with_http_listener(addr)
            .install()
            .map_err(|e| MetricsError::InitializationFailed(e.to_string()))?;
    } else {
        let handle = builder
            .install_recorder()
            .map_err(|e| MetricsError::InitializationFailed(e.to_string()))?;
        METRICS_HANDLE
            .set(handle)
            .map_err(|_| MetricsError::AlreadyInitialized)?;
    }

    BoreasMetrics::register();
    Ok(())
}

/// Renders the Prometheus text output, empty if no local handle is installed.
#[must_use]
pub fn render_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Errors that can occur during metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Metrics already initialized
    #[error("Metrics system already initialized")]
    AlreadyInitialized,

    /// Invalid endpoint address
    #[error("Invalid endpoint address: {0}")]
    InvalidAddress(String),

    /// Initialization failed
    #[error("Metrics initialization failed: {0}")]
    InitializationFailed(String),
}
