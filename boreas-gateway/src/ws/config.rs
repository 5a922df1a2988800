//! Connection configuration.

use boreas_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use boreas_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long `close` waits for the receive loop before aborting it.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Largest accepted message in bytes; a larger one ends the connection.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Client ping interval in milliseconds (0 = disabled).
    #[serde(default)]
    pub heartbeat_interval_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_close_timeout_ms() -> u64 {
    5_000
}

fn default_max_message_bytes() -> usize {
    1024 * 1024
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            max_message_bytes: default_max_message_bytes(),
            heartbeat_interval_ms: 0,
        }
    }
}

impl ConnectionConfig {
    /// Creates a new builder for `ConnectionConfig`.
    #[must_use]
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the close timeout as a Duration.
    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Returns the heartbeat interval, `None` when disabled.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}

impl Validatable for ConnectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("connection");
        Validator::new(&mut ctx)
            .positive("connect_timeout_ms", &self.connect_timeout_ms)
            .positive("close_timeout_ms", &self.close_timeout_ms)
            .in_range("max_message_bytes", &self.max_message_bytes, &1024, &(64 * 1024 * 1024));
        ctx.into_result()
    }
}

impl Configurable for ConnectionConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        let env = env.section("connection");
        env.apply_number("connect_timeout_ms", &mut self.connect_timeout_ms);
        env.apply_number("close_timeout_ms", &mut self.close_timeout_ms);
        env.apply_number("max_message_bytes", &mut self.max_message_bytes);
        env.apply_number("heartbeat_interval_ms", &mut self.heartbeat_interval_ms);
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let env = env.section("connection");
        [
            "connect_timeout_ms",
            "close_timeout_ms",
            "max_message_bytes",
            "heartbeat_interval_ms",
        ]
        .iter()
        .map(|field| env.var_name(field))
        .collect()
    }
}

/// Builder for `ConnectionConfig`.
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    connect_timeout_ms: Option<u64>,
    close_timeout_ms: Option<u64>,
    max_message_bytes: Option<usize>,
    heartbeat_interval_ms: Option<u64>,
}

impl ConnectionConfigBuilder {
    /// Sets the connect timeout in milliseconds.
    #[must_use]
    pub fn connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = Some(timeout);
        self
    }

    /// Sets the close timeout in milliseconds.
    #[must_use]
    pub fn close_timeout_ms(mut self, timeout: u64) -> Self {
        self.close_timeout_ms = Some(timeout);
        self
    }

    /// Sets the receive buffer size in bytes.
    #[must_use]
    pub fn max_message_bytes(mut self, bytes: usize) -> Self {
        self.max_message_bytes = Some(bytes);
        self
    }

    /// Sets the heartbeat interval in milliseconds (0 = disabled).
    #[must_use]
    pub fn heartbeat_interval_ms(mut self, interval: u64) -> Self {
        self.heartbeat_interval_ms = Some(interval);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            close_timeout_ms: self.close_timeout_ms.unwrap_or_else(default_close_timeout_ms),
            max_message_bytes: self
                .max_message_bytes
                .unwrap_or_else(default_max_message_bytes),
            heartbeat_interval_ms: self.heartbeat_interval_ms.unwrap_or(0),
        }
    }
}
