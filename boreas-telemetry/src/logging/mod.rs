//! Structured logging for Boreas.
//!
//! Installs a `tracing_subscriber` registry with:
//! - an `EnvFilter` (`RUST_LOG` wins over the configured level)
//! - JSON or pretty stdout output
//! - optional rolling file output through `tracing_appender`

mod config;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

const LOG_FILE_NAME: &str = "boreas.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Initialize the logging system with the given configuration.
///
/// Returns the file writer guards; keep them alive for the duration of the
/// program so buffered lines are flushed.
///
/// # Example
///
/// ```no_run
/// use boreas_telemetry::logging::{init_logging, LogConfig};
///
/// let _guards = init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::InvalidConfig(format!("level '{}': {e}", config.level)))?;

    let mut guards = Vec::new();
    let mut layers: Vec<BoxedLayer<_>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => layers.push(stdout_layer(config)),
            LogOutput::File {
                directory,
                rotation,
            } => {
                std::fs::create_dir_all(directory)?;
                let (layer, guard) = file_layer(config, directory, *rotation);
                layers.push(layer);
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(guards)
}

fn span_events(config: &LogConfig) -> FmtSpan {
    if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

fn stdout_layer<S>(config: &LogConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config));

    match config.format {
        LogFormat::Json => Box::new(base.json().flatten_event(true)),
        LogFormat::Pretty => Box::new(base.pretty()),
    }
}

fn file_layer<S>(
    config: &LogConfig,
    directory: &str,
    rotation: Option<RotationConfig>,
) -> (BoxedLayer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let appender = match rotation.unwrap_or(RotationConfig::Daily) {
        RotationConfig::Hourly => tracing_appender::rolling::hourly(directory, LOG_FILE_NAME),
        RotationConfig::Daily => tracing_appender::rolling::daily(directory, LOG_FILE_NAME),
        RotationConfig::Never => tracing_appender::rolling::never(directory, LOG_FILE_NAME),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_span_events(span_events(config))
        .json()
        .flatten_event(true);

    (Box::new(layer), guard)
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("Failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid logging configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
