//! Rate limiter configuration.

use boreas_core::config::{Configurable, EnvOverride, Validatable, ValidationContext, Validator};
use boreas_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the request and order rate limiter.
///
/// `requests_per_minute` and `orders_per_second` are the venue's published
/// limits; only `rate_limit_factor` of them is actually granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether admission is enforced at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Published request weight per minute.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Published orders per second.
    #[serde(default = "default_orders_per_second")]
    pub orders_per_second: u32,

    /// Number of slices the one-minute request window is divided into.
    #[serde(default = "default_window_divisor")]
    pub window_divisor: u32,

    /// Stretch applied to the one-second order window.
    #[serde(default = "default_order_interval_factor")]
    pub order_interval_factor: f64,

    /// Fraction of the published limits granted to this process.
    #[serde(default = "default_rate_limit_factor")]
    pub rate_limit_factor: f64,

    /// Sleep between admission attempts in milliseconds.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Upper bound on the lock wait of a rate snapshot in milliseconds.
    #[serde(default = "default_snapshot_timeout_ms")]
    pub snapshot_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    1200
}

fn default_orders_per_second() -> u32 {
    10
}

fn default_window_divisor() -> u32 {
    6
}

fn default_order_interval_factor() -> f64 {
    1.1
}

fn default_rate_limit_factor() -> f64 {
    0.6
}

fn default_poll_delay_ms() -> u64 {
    20
}

fn default_snapshot_timeout_ms() -> u64 {
    100
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_minute: default_requests_per_minute(),
            orders_per_second: default_orders_per_second(),
            window_divisor: default_window_divisor(),
            order_interval_factor: default_order_interval_factor(),
            rate_limit_factor: default_rate_limit_factor(),
            poll_delay_ms: default_poll_delay_ms(),
            snapshot_timeout_ms: default_snapshot_timeout_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Creates a new builder for `RateLimitConfig`.
    #[must_use]
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::default()
    }

    /// Capacity of one request window slice.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn request_capacity(&self) -> u32 {
        let granted = (f64::from(self.requests_per_minute) * self.rate_limit_factor).floor() as u32;
        (granted / self.window_divisor.max(1)).max(1)
    }

    /// Length of one request window slice.
    #[must_use]
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(60) / self.window_divisor.max(1)
    }

    /// Capacity of the order window.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn order_capacity(&self) -> u32 {
        ((f64::from(self.orders_per_second) * self.rate_limit_factor).floor() as u32).max(1)
    }

    /// Length of the order window.
    ///
    /// The stretch factor is clamped to `1.0..=2.0`; NaN counts as `1.0`.
    #[must_use]
    pub fn order_interval(&self) -> Duration {
        Duration::from_secs(1).mul_f64(self.order_interval_factor.max(1.0).min(2.0))
    }

    /// Returns the poll delay as a Duration.
    #[must_use]
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms.max(1))
    }

    /// Returns the snapshot lock timeout as a Duration.
    #[must_use]
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}

impl Validatable for RateLimitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut ctx = ValidationContext::new();
        ctx.enter("rate_limit");
        Validator::new(&mut ctx)
            .positive("requests_per_minute", &self.requests_per_minute)
            .positive("orders_per_second", &self.orders_per_second)
            .positive("window_divisor", &self.window_divisor)
            .in_range("order_interval_factor", &self.order_interval_factor, &1.0, &2.0)
            .custom(
                "rate_limit_factor",
                || self.rate_limit_factor > 0.0 && self.rate_limit_factor <= 1.0,
                "must be in (0, 1]",
            )
            .positive("poll_delay_ms", &self.poll_delay_ms);
        ctx.into_result()
    }
}

impl Configurable for RateLimitConfig {
    fn apply_env_overrides(&mut self, env: &EnvOverride<'_>) {
        let env = env.section("rate_limit");
        env.apply_bool("enabled", &mut self.enabled);
        env.apply_number("requests_per_minute", &mut self.requests_per_minute);
        env.apply_number("orders_per_second", &mut self.orders_per_second);
        env.apply_number("window_divisor", &mut self.window_divisor);
        env.apply_number("order_interval_factor", &mut self.order_interval_factor);
        env.apply_number("rate_limit_factor", &mut self.rate_limit_factor);
        env.apply_number("poll_delay_ms", &mut self.poll_delay_ms);
        env.apply_number("snapshot_timeout_ms", &mut self.snapshot_timeout_ms);
    }

    fn env_var_names(env: &EnvOverride<'_>) -> Vec<String> {
        let env = env.section("rate_limit");
        [
            "enabled",
            "requests_per_minute",
            "orders_per_second",
            "window_divisor",
            "order_interval_factor",
            "rate_limit_factor",
            "poll_delay_ms",
            "snapshot_timeout_ms",
        ]
        .iter()
        .map(|field| env.var_name(field))
        .collect()
    }
}

/// Builder for `RateLimitConfig`.
#[derive(Debug, Default)]
pub struct RateLimitConfigBuilder {
    enabled: Option<bool>,
    requests_per_minute: Option<u32>,
    orders_per_second: Option<u32>,
    window_divisor: Option<u32>,
    order_interval_factor: Option<f64>,
    rate_limit_factor: Option<f64>,
    poll_delay_ms: Option<u64>,
    snapshot_timeout_ms: Option<u64>,
}

impl RateLimitConfigBuilder {
    /// Enables or disables admission control.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the published request weight per minute.
    #[must_use]
    pub fn requests_per_minute(mut self, limit: u32) -> Self {
        self.requests_per_minute = Some(limit);
        self
    }

    /// Sets the published orders per second.
    #[must_use]
    pub fn orders_per_second(mut self, limit: u32) -> Self {
        self.orders_per_second = Some(limit);
        self
    }

    /// Sets the request window divisor.
    #[must_use]
    pub fn window_divisor(mut self, divisor: u32) -> Self {
        self.window_divisor = Some(divisor);
        self
    }

    /// Sets the order window stretch factor.
    #[must_use]
    pub fn order_interval_factor(mut self, factor: f64) -> Self {
        self.order_interval_factor = Some(factor);
        self
    }

    /// Sets the granted fraction of the published limits.
    #[must_use]
    pub fn rate_limit_factor(mut self, factor: f64) -> Self {
        self.rate_limit_factor = Some(factor);
        self
    }

    /// Sets the poll delay.
    #[must_use]
    pub fn poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the snapshot lock timeout.
    #[must_use]
    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> RateLimitConfig {
        RateLimitConfig {
            enabled: self.enabled.unwrap_or_else(default_enabled),
            requests_per_minute: self
                .requests_per_minute
                .unwrap_or_else(default_requests_per_minute),
            orders_per_second: self
                .orders_per_second
                .unwrap_or_else(default_orders_per_second),
            window_divisor: self.window_divisor.unwrap_or_else(default_window_divisor),
            order_interval_factor: self
                .order_interval_factor
                .unwrap_or_else(default_order_interval_factor),
            rate_limit_factor: self
                .rate_limit_factor
                .unwrap_or_else(default_rate_limit_factor),
            poll_delay_ms: self.poll_delay_ms.unwrap_or_else(default_poll_delay_ms),
            snapshot_timeout_ms: self
                .snapshot_timeout_ms
                .unwrap_or_else(default_snapshot_timeout_ms),
        }
    }
}
