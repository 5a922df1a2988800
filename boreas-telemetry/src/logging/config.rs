//! Logging configuration types.

use boreas_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use boreas_core::error::ConfigError;
use serde::{Deserialize, Serialize};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the logging system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level; `RUST_LOG` takes precedence when set
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Include thread IDs in log output
    #[serde(default)]
    pub include_thread_id: bool,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,

    /// Include span enter/exit events
    #[serde(default)]
    pub include_span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
            include_span_events: false,
        }
    }
}

impl LogConfig {
    /// Returns a copy with the level forced to `debug` unless already more verbose.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        if self.level != "trace" {
            self.level = "debug".to_string();
        }
        self
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stdout]
}

impl Validatable for LogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("logging");
        let level = self.level.to_lowercase();
        Validator::new(&mut ctx).custom(
            "level",
            || LEVELS.contains(&level.as_str()),
            "must be one of trace, debug, info, warn, error",
        );
        for output in &self.outputs {
            if let LogOutput::File { directory, .. } = output {
                Validator::new(&mut ctx).require_non_empty("outputs.directory", directory);
            }
        }
        ctx.into_result()
    }
}

impl Configurable for LogConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        let env = env.section("logging");
        env.apply_string("level", &mut self.level);
        let mut format = String::new();
        env.apply_string("format", &mut format);
        match format.to_lowercase().as_str() {
            "json" => self.format = LogFormat::Json,
            "pretty" => self.format = LogFormat::Pretty,
            _ => {}
        }
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let env = env.section("logging");
        vec![env.var_name("level"), env.var_name("format")]
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for log aggregation systems
    #[default]
    Json,
    /// Human-readable format for development
    Pretty,
}

/// Log output target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to rolling files in a directory
    File {
        /// Directory for log files
        directory: String,
        /// Rotation policy, daily when absent
        #[serde(default)]
        rotation: Option<RotationConfig>,
    },
}

/// Log rotation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// Rotate logs hourly
    Hourly,
    /// Rotate logs daily
    Daily,
    /// Never rotate (single file)
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.outputs, vec![LogOutput::Stdout]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = LogConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            outputs: vec![
                LogOutput::Stdout,
                LogOutput::File {
                    directory: "/var/log/boreas".to_string(),
                    rotation: Some(RotationConfig::Hourly),
                },
            ],
            include_thread_id: true,
            include_file_info: true,
            include_span_events: false,
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_level() {
        let config = LogConfig {
            level: "loud".to_string(),
            ..LogConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_verbose() {
        assert_eq!(LogConfig::default().verbose().level, "debug");
        let trace = LogConfig {
            level: "trace".to_string(),
            ..LogConfig::default()
        };
        assert_eq!(trace.verbose().level, "trace");
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            ("BOREAS_LOGGING_LEVEL".to_string(), "warn".to_string()),
            ("BOREAS_LOGGING_FORMAT".to_string(), "Pretty".to_string()),
        ]);
        let mut config = LogConfig::default();
        config.apply_env_overrides(&EnvOverride::new(&vars, "BOREAS"));
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
