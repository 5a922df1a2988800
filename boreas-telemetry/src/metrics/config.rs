//! Metrics configuration types.

use boreas_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use boreas_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the metrics system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to expose a Prometheus HTTP endpoint
    #[serde(default)]
    pub expose_endpoint: bool,

    /// Address for the Prometheus endpoint (e.g., "0.0.0.0:9090")
    #[serde(default = "default_endpoint_address")]
    pub endpoint_address: String,

    /// Histogram buckets for duration metrics (in seconds)
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expose_endpoint: false,
            endpoint_address: default_endpoint_address(),
            duration_buckets: default_duration_buckets(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_endpoint_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_duration_buckets() -> Vec<f64> {
    vec![
        0.001, // 1ms
        0.005, // 5ms
        0.02,  // 20ms, one limiter poll
        0.1,   // 100ms
        0.5,   // 500ms
        1.0,   // 1s
        5.0,   // 5s
        10.0,  // 10s
        60.0,  // 1min
    ]
}

impl Validatable for MetricsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("metrics");
        let address = self.endpoint_address.clone();
        Validator::new(&mut ctx)
            .custom(
                "endpoint_address",
                || !self.expose_endpoint || address.parse::<SocketAddr>().is_ok(),
                "must be a socket address such as 0.0.0.0:9090",
            )
            .custom(
                "duration_buckets",
                || !self.duration_buckets.is_empty(),
                "must contain at least one bucket",
            );
        ctx.into_result()
    }
}

impl Configurable for MetricsConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        let env = env.section("metrics");
        env.apply_bool("enabled", &mut self.enabled);
        env.apply_bool("expose_endpoint", &mut self.expose_endpoint);
        env.apply_string("endpoint_address", &mut self.endpoint_address);
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let env = env.section("metrics");
        ["enabled", "expose_endpoint", "endpoint_address"]
            .iter()
            .map(|field| env.var_name(field))
            .collect()
    }
}
