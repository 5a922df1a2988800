//! Configuration loader supporting YAML, TOML and JSON.

use super::traits::{Configurable, Validatable};
use super::validation::{EnvOverride, EnvSource, ProcessEnv};
use crate::error::ConfigError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Configuration loader with format detection, environment overrides and
/// validation.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: Option<String>,
    validate: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new loader. Validation is on, no env prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env_prefix: None,
            validate: true,
        }
    }

    /// Sets the environment variable prefix for overrides (e.g. "BOREAS").
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets whether to validate the configuration after loading.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Returns the environment variable prefix, if set.
    #[must_use]
    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    /// Loads a complete configuration.
    ///
    /// Reads `path` if it exists and falls back to `T::default()` otherwise,
    /// then applies process environment overrides and validates.
    pub fn load<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default + Configurable + Validatable,
        P: AsRef<Path>,
    {
        self.load_with_env(path, &ProcessEnv)
    }

    /// Same as [`load`](Self::load) with an explicit variable source.
    pub fn load_with_env<T, P>(&self, path: P, source: &dyn EnvSource) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default + Configurable + Validatable,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let config = if path.exists() {
            self.load_file(path)?
        } else {
            T::default()
        };
        self.finish(config, source)
    }

    /// Applies overrides and validation to an already built configuration.
    pub fn finish<T>(&self, mut config: T, source: &dyn EnvSource) -> Result<T, ConfigError>
    where
        T: Configurable + Validatable,
    {
        if let Some(prefix) = &self.env_prefix {
            config.apply_env_overrides(&EnvOverride::new(source, prefix.clone()));
        }
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Loads configuration from a file, detecting the format from its extension.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason: "Unrecognized file extension. Supported: .yaml, .yml, .toml, .json".to_string(),
        })?;

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.parse(&content, format, &path.display().to_string())
    }

    /// Loads configuration from a string with the specified format.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        self.parse(content, format, "<string>")
    }

    #[allow(clippy::unused_self)]
    fn parse<T>(&self, content: &str, format: ConfigFormat, origin: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: origin.to_string(),
            reason,
        };
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| invalid(format!("YAML parse error: {e}")))
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| invalid(format!("TOML parse error: {e}")))
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| invalid(format!("JSON parse error: {e}")))
            }
        }
    }

    /// Serializes a configuration to a string in the specified format.
    pub fn serialize<T>(config: &T, format: ConfigFormat) -> Result<String, ConfigError>
    where
        T: Serialize,
    {
        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: "<serialize>".to_string(),
            reason,
        };
        match format {
            ConfigFormat::Yaml => serde_yaml::to_string(config)
                .map_err(|e| invalid(format!("YAML serialization error: {e}"))),
            ConfigFormat::Toml => toml::to_string_pretty(config)
                .map_err(|e| invalid(format!("TOML serialization error: {e}"))),
            ConfigFormat::Json => serde_json::to_string_pretty(config)
                .map_err(|e| invalid(format!("JSON serialization error: {e}"))),
        }
    }
}
