//! Multiplexer configuration.

use boreas_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use boreas_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::stream::DEFAULT_ENDPOINT;
use crate::ws::ConnectionConfig;

/// Configuration for [`StreamMultiplexer`](super::StreamMultiplexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplexerConfig {
    /// Combined-stream base URL; `?streams=...` is appended per connection.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum number of streams carried by one connection.
    #[serde(default = "default_streams_per_socket")]
    pub streams_per_socket: usize,

    /// Period of the rebuild cycle in milliseconds.
    #[serde(default = "default_rebuild_interval_ms")]
    pub rebuild_interval_ms: u64,

    /// Silence after which a connection is considered dead, in milliseconds.
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,

    /// Age after which a healthy connection is rotated, in milliseconds.
    #[serde(default = "default_max_connection_age_ms")]
    pub max_connection_age_ms: u64,

    /// Delay between retiring a connection and closing its transport.
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,

    /// Aged connections are only rotated when the wall-clock second is
    /// strictly between this and `rotation_window_end_sec`.
    #[serde(default = "default_rotation_window_start_sec")]
    pub rotation_window_start_sec: u32,

    /// End of the rotation window (exclusive).
    #[serde(default = "default_rotation_window_end_sec")]
    pub rotation_window_end_sec: u32,

    /// Availability probe attempts per cycle.
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    /// Per-connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_streams_per_socket() -> usize {
    10
}

fn default_rebuild_interval_ms() -> u64 {
    5_000
}

fn default_watchdog_timeout_ms() -> u64 {
    30_000
}

fn default_max_connection_age_ms() -> u64 {
    2 * 60 * 60 * 1000
}

fn default_close_grace_ms() -> u64 {
    10_000
}

fn default_rotation_window_start_sec() -> u32 {
    15
}

fn default_rotation_window_end_sec() -> u32 {
    45
}

fn default_probe_attempts() -> u32 {
    2
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            streams_per_socket: default_streams_per_socket(),
            rebuild_interval_ms: default_rebuild_interval_ms(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            max_connection_age_ms: default_max_connection_age_ms(),
            close_grace_ms: default_close_grace_ms(),
            rotation_window_start_sec: default_rotation_window_start_sec(),
            rotation_window_end_sec: default_rotation_window_end_sec(),
            probe_attempts: default_probe_attempts(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl MultiplexerConfig {
    /// Creates a new builder for `MultiplexerConfig`.
    #[must_use]
    pub fn builder() -> MultiplexerConfigBuilder {
        MultiplexerConfigBuilder::default()
    }

    /// Returns the rebuild interval as a Duration, never shorter than 1 ms.
    #[must_use]
    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_millis(self.rebuild_interval_ms.max(1))
    }

    /// Returns the watchdog timeout as a Duration.
    #[must_use]
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Returns the maximum connection age as a Duration.
    #[must_use]
    pub fn max_connection_age(&self) -> Duration {
        Duration::from_millis(self.max_connection_age_ms)
    }

    /// Returns the close grace period as a Duration.
    #[must_use]
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

impl Validatable for MultiplexerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("multiplexer");
        Validator::new(&mut ctx)
            .valid_ws_url("endpoint", &self.endpoint)
            .in_range("streams_per_socket", &self.streams_per_socket, &1, &1024)
            .positive("rebuild_interval_ms", &self.rebuild_interval_ms)
            .positive("watchdog_timeout_ms", &self.watchdog_timeout_ms)
            .positive("max_connection_age_ms", &self.max_connection_age_ms)
            .in_range("rotation_window_end_sec", &self.rotation_window_end_sec, &1, &60)
            .custom(
                "rotation_window_start_sec",
                || self.rotation_window_start_sec < self.rotation_window_end_sec,
                "must be below rotation_window_end_sec",
            )
            .positive("probe_attempts", &self.probe_attempts);
        if let Err(e) = self.connection.validate() {
            ctx.add_error(e);
        }
        ctx.into_result()
    }
}

impl Configurable for MultiplexerConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        let env = env.section("multiplexer");
        env.apply_string("endpoint", &mut self.endpoint);
        env.apply_number("streams_per_socket", &mut self.streams_per_socket);
        env.apply_number("rebuild_interval_ms", &mut self.rebuild_interval_ms);
        env.apply_number("watchdog_timeout_ms", &mut self.watchdog_timeout_ms);
        env.apply_number("max_connection_age_ms", &mut self.max_connection_age_ms);
        env.apply_number("close_grace_ms", &mut self.close_grace_ms);
        env.apply_number("rotation_window_start_sec", &mut self.rotation_window_start_sec);
        env.apply_number("rotation_window_end_sec", &mut self.rotation_window_end_sec);
        env.apply_number("probe_attempts", &mut self.probe_attempts);
        self.connection.apply_env_overrides(&env);
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let section = env.section("multiplexer");
        let mut names: Vec<String> = [
            "endpoint",
            "streams_per_socket",
            "rebuild_interval_ms",
            "watchdog_timeout_ms",
            "max_connection_age_ms",
            "close_grace_ms",
            "rotation_window_start_sec",
            "rotation_window_end_sec",
            "probe_attempts",
        ]
        .iter()
        .map(|field| section.var_name(field))
        .collect();
        names.extend(ConnectionConfig::env_var_names(&section));
        names
    }
}

/// Builder for `MultiplexerConfig`.
#[derive(Debug, Default)]
pub struct MultiplexerConfigBuilder {
    endpoint: Option<String>,
    streams_per_socket: Option<usize>,
    rebuild_interval_ms: Option<u64>,
    watchdog_timeout_ms: Option<u64>,
    max_connection_age_ms: Option<u64>,
    close_grace_ms: Option<u64>,
    rotation_window: Option<(u32, u32)>,
    probe_attempts: Option<u32>,
    connection: Option<ConnectionConfig>,
}

impl MultiplexerConfigBuilder {
    /// Sets the combined-stream base URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the per-connection stream capacity.
    #[must_use]
    pub fn streams_per_socket(mut self, count: usize) -> Self {
        self.streams_per_socket = Some(count);
        self
    }

    /// Sets the rebuild period.
    #[must_use]
    pub fn rebuild_interval(mut self, interval: Duration) -> Self {
        self.rebuild_interval_ms = Some(millis(interval));
        self
    }

    /// Sets the watchdog timeout.
    #[must_use]
    pub fn watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout_ms = Some(millis(timeout));
        self
    }

    /// Sets the maximum connection age.
    #[must_use]
    pub fn max_connection_age(mut self, age: Duration) -> Self {
        self.max_connection_age_ms = Some(millis(age));
        self
    }

    /// Sets the close grace period.
    #[must_use]
    pub fn close_grace(mut self, grace: Duration) -> Self {
        self.close_grace_ms = Some(millis(grace));
        self
    }

    /// Sets the rotation window in seconds of the minute.
    #[must_use]
    pub fn rotation_window(mut self, start_sec: u32, end_sec: u32) -> Self {
        self.rotation_window = Some((start_sec, end_sec));
        self
    }

    /// Sets the number of probe attempts per cycle.
    #[must_use]
    pub fn probe_attempts(mut self, attempts: u32) -> Self {
        self.probe_attempts = Some(attempts);
        self
    }

    /// Sets the per-connection configuration.
    #[must_use]
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> MultiplexerConfig {
        let (rotation_window_start_sec, rotation_window_end_sec) = self.rotation_window.unwrap_or((
            default_rotation_window_start_sec(),
            default_rotation_window_end_sec(),
        ));
        MultiplexerConfig {
            endpoint: self.endpoint.unwrap_or_else(default_endpoint),
            streams_per_socket: self
                .streams_per_socket
                .unwrap_or_else(default_streams_per_socket),
            rebuild_interval_ms: self
                .rebuild_interval_ms
                .unwrap_or_else(default_rebuild_interval_ms),
            watchdog_timeout_ms: self
                .watchdog_timeout_ms
                .unwrap_or_else(default_watchdog_timeout_ms),
            max_connection_age_ms: self
                .max_connection_age_ms
                .unwrap_or_else(default_max_connection_age_ms),
            close_grace_ms: self.close_grace_ms.unwrap_or_else(default_close_grace_ms),
            rotation_window_start_sec,
            rotation_window_end_sec,
            probe_attempts: self.probe_attempts.unwrap_or_else(default_probe_attempts),
            connection: self.connection.unwrap_or_default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MultiplexerConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.streams_per_socket, 10);
        assert_eq!(config.rebuild_interval(), Duration::from_secs(5));
        assert_eq!(config.watchdog_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_connection_age(), Duration::from_secs(7200));
        assert_eq!(config.close_grace(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: MultiplexerConfig = serde_yaml::from_str(
            "streams_per_socket: 2\nconnection:\n  heartbeat_interval_ms: 1000\n",
        )
        .unwrap();
        assert_eq!(config.streams_per_socket, 2);
        assert_eq!(config.watchdog_timeout_ms, 30_000);
        assert_eq!(config.connection.heartbeat_interval_ms, 1000);
        assert_eq!(config.connection.close_timeout_ms, 5_000);
    }

    #[test]
    fn test_validation() {
        let config = MultiplexerConfig::builder().streams_per_socket(0).build();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("multiplexer.streams_per_socket"));

        let config = MultiplexerConfig::builder().rotation_window(45, 15).build();
        assert!(config.validate().is_err());

        let config = MultiplexerConfig::builder().endpoint("https://example.com").build();
        assert!(config.validate().is_err());

        let config = MultiplexerConfig::builder()
            .connection(ConnectionConfig::builder().max_message_bytes(1).build())
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_reach_connection() {
        let vars: HashMap<String, String> = [
            ("BOREAS_MULTIPLEXER_STREAMS_PER_SOCKET", "3"),
            ("BOREAS_MULTIPLEXER_CONNECTION_HEARTBEAT_INTERVAL_MS", "2500"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let env = EnvOverride::new(&vars, "boreas");

        let mut config = MultiplexerConfig::default();
        config.apply_env_overrides(&env);
        assert_eq!(config.streams_per_socket, 3);
        assert_eq!(config.connection.heartbeat_interval_ms, 2500);

        let names = MultiplexerConfig::env_var_names(&env);
        assert!(names.contains(&"BOREAS_MULTIPLEXER_ENDPOINT".to_string()));
        assert!(names.contains(&"BOREAS_MULTIPLEXER_CONNECTION_CONNECT_TIMEOUT_MS".to_string()));
    }
}
