//! Root configuration document.

use boreas_core::config::{Configurable, EnvOverride, Validatable};
use boreas_core::error::ConfigError;
use boreas_gateway::multiplexer::MultiplexerConfig;
use boreas_gateway::rest::RateLimitConfig;
use boreas_telemetry::logging::LogConfig;
use boreas_telemetry::metrics::MetricsConfig;
use serde::{Deserialize, Serialize};

/// Prefix of every environment override, e.g. `BOREAS_RATE_LIMIT_ENABLED`.
pub const ENV_PREFIX: &str = "BOREAS";

/// Everything the `boreas` binary can be configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoreasConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Request and order admission limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Stream multiplexer and per-connection settings.
    #[serde(default)]
    pub multiplexer: MultiplexerConfig,
}

impl Validatable for BoreasConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.metrics.validate()?;
        self.rate_limit.validate()?;
        self.multiplexer.validate()
    }
}

impl Configurable for BoreasConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        self.logging.apply_env_overrides(env);
        self.metrics.apply_env_overrides(env);
        self.rate_limit.apply_env_overrides(env);
        self.multiplexer.apply_env_overrides(env);
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let mut names = LogConfig::env_var_names(env);
        names.extend(MetricsConfig::env_var_names(env));
        names.extend(RateLimitConfig::env_var_names(env));
        names.extend(MultiplexerConfig::env_var_names(env));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boreas_core::config::{ConfigFormat, ConfigLoader};
    use std::collections::HashMap;

    const SAMPLE: &str = r"
logging:
  level: debug
  format: pretty
rate_limit:
  rate_limit_factor: 1.0
multiplexer:
  streams_per_socket: 4
  connection:
    heartbeat_interval_ms: 20000
";

    #[test]
    fn test_defaults_are_valid() {
        assert!(BoreasConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let loader = ConfigLoader::new();
        let config: BoreasConfig = loader.load_str(SAMPLE, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.rate_limit.request_capacity(), 200);
        assert_eq!(config.multiplexer.streams_per_socket, 4);
        assert_eq!(config.multiplexer.connection.heartbeat_interval_ms, 20_000);
        assert_eq!(config.multiplexer.watchdog_timeout_ms, 30_000);
    }

    #[test]
    fn test_env_overrides_and_validation() {
        let loader = ConfigLoader::new().with_env_prefix(ENV_PREFIX);
        let config: BoreasConfig = loader.load_str(SAMPLE, ConfigFormat::Yaml).unwrap();

        let vars = HashMap::from([
            ("BOREAS_RATE_LIMIT_ENABLED".to_string(), "false".to_string()),
            ("BOREAS_MULTIPLEXER_STREAMS_PER_SOCKET".to_string(), "8".to_string()),
        ]);
        let config = loader.finish(config, &vars).unwrap();
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.multiplexer.streams_per_socket, 8);

        let vars = HashMap::from([(
            "BOREAS_MULTIPLEXER_STREAMS_PER_SOCKET".to_string(),
            "0".to_string(),
        )]);
        assert!(loader.finish(BoreasConfig::default(), &vars).is_err());
    }

    #[test]
    fn test_yaml_round_trip_keeps_sections() {
        let yaml = ConfigLoader::serialize(&BoreasConfig::default(), ConfigFormat::Yaml).unwrap();
        for section in ["logging:", "metrics:", "rate_limit:", "multiplexer:"] {
            assert!(yaml.contains(section), "missing {section}");
        }
        let parsed: BoreasConfig = ConfigLoader::new().load_str(&yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(parsed, BoreasConfig::default());
    }

    #[test]
    fn test_env_var_names() {
        let vars: HashMap<String, String> = HashMap::new();
        let names = BoreasConfig::env_var_names(&EnvOverride::new(&vars, ENV_PREFIX));
        assert!(names.contains(&"BOREAS_LOGGING_LEVEL".to_string()));
        assert!(names.contains(&"BOREAS_RATE_LIMIT_POLL_DELAY_MS".to_string()));
        assert!(names.contains(&"BOREAS_MULTIPLEXER_CONNECTION_MAX_MESSAGE_BYTES".to_string()));
    }
}
