//! Configuration traits for validation and environment overrides.

use super::validation::EnvOverride;
use crate::error::ConfigError;

/// Trait for types that can be validated.
///
/// # Example
///
/// ```rust
/// use boreas_core::config::Validatable;
/// use boreas_core::error::ConfigError;
///
/// struct SocketConfig {
///     streams_per_socket: usize,
/// }
///
/// impl Validatable for SocketConfig {
///     fn validate(&self) -> Result<(), ConfigError> {
///         if self.streams_per_socket == 0 {
///             return Err(ConfigError::invalid_value(
///                 "streams_per_socket",
///                 "must be at least 1",
///             ));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(SocketConfig { streams_per_socket: 10 }.validate().is_ok());
/// assert!(SocketConfig { streams_per_socket: 0 }.validate().is_err());
/// ```
pub trait Validatable {
    /// Validates the configuration.
    ///
    /// Returns `Ok(())` if the configuration is valid, or a `ConfigError`
    /// describing what is invalid.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Trait for types that support environment variable overrides.
///
/// Each section reads variables named `<PREFIX>_<SECTION>_<FIELD>` through the
/// scoped [`EnvOverride`] it is handed.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use boreas_core::config::{Configurable, EnvOverride};
///
/// #[derive(Default)]
/// struct SocketConfig {
///     streams_per_socket: usize,
/// }
///
/// impl Configurable for SocketConfig {
///     fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
///         env.apply_number("streams_per_socket", &mut self.streams_per_socket);
///     }
///
///     fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
///         vec![env.var_name("streams_per_socket")]
///     }
/// }
///
/// let vars = HashMap::from([("BOREAS_SOCKET_STREAMS_PER_SOCKET".to_string(), "4".to_string())]);
/// let env = EnvOverride::new(&vars, "BOREAS").section("socket");
/// let mut config = SocketConfig::default();
/// config.apply_env_overrides(&env);
/// assert_eq!(config.streams_per_socket, 4);
/// ```
pub trait Configurable {
    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>);

    /// Returns the environment variable names that can override this configuration.
    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestConfig {
        value: i32,
    }

    impl Validatable for TestConfig {
        fn validate(&self) -> Result<(), ConfigError> {
            if self.value < 0 {
                return Err(ConfigError::invalid_value(
                    "value",
                    "Value must be non-negative",
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_validatable_success() {
        let config = TestConfig { value: 10 };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validatable_failure() {
        let config = TestConfig { value: -1 };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("value"));
    }
}
