//! Configuration validation and environment override utilities.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// Result type for validation operations.
pub type ValidationResult = Result<(), ConfigError>;

/// Context for validation operations.
///
/// Tracks the current path in the configuration tree for better error messages.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    path: Vec<String>,
    errors: Vec<ConfigError>,
}

impl ValidationContext {
    /// Creates a new validation context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new section in the configuration.
    pub fn enter(&mut self, section: impl Into<String>) {
        self.path.push(section.into());
    }

    /// Exits the current section.
    pub fn exit(&mut self) {
        self.path.pop();
    }

    /// Returns the current path as a dot-separated string.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Adds a validation error.
    pub fn add_error(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    /// Returns true if there are no validation errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the collected validation errors.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Consumes the context and returns the first error, if any.
    pub fn into_result(self) -> ValidationResult {
        self.errors.into_iter().next().map_or(Ok(()), Err)
    }

    /// Creates a missing field error with the current path context.
    #[must_use]
    pub fn missing_field(&self, field: impl Into<String>) -> ConfigError {
        let section = (!self.path.is_empty()).then(|| self.current_path());
        ConfigError::MissingField {
            field: field.into(),
            section,
        }
    }

    /// Creates an invalid value error qualified with the current path.
    #[must_use]
    pub fn invalid_value(&self, field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
        let field = field.into();
        let field = if self.path.is_empty() {
            field
        } else {
            format!("{}.{field}", self.current_path())
        };
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Fluent validator for configuration fields.
///
/// ```
/// use boreas_core::config::{ValidationContext, Validator};
///
/// let mut ctx = ValidationContext::new();
/// ctx.enter("multiplexer");
/// Validator::new(&mut ctx)
///     .positive("streams_per_socket", &0_usize)
///     .valid_ws_url("endpoint", "wss://stream.binance.com:9443/stream");
/// let err = ctx.into_result().unwrap_err();
/// assert!(err.to_string().contains("multiplexer.streams_per_socket"));
/// ```
#[derive(Debug)]
pub struct Validator<'a> {
    ctx: &'a mut ValidationContext,
}

impl<'a> Validator<'a> {
    /// Creates a new validator with the given context.
    pub fn new(ctx: &'a mut ValidationContext) -> Self {
        Self { ctx }
    }

    /// Validates that a string field is not empty.
    pub fn require_non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            let error = self.ctx.missing_field(field);
            self.ctx.add_error(error);
        }
        self
    }

    /// Validates that a value is within an inclusive range.
    pub fn in_range<T: PartialOrd + Display>(
        &mut self,
        field: &str,
        value: &T,
        min: &T,
        max: &T,
    ) -> &mut Self {
        // NaN is out of every range.
        if !(min <= value && value <= max) {
            let error = self
                .ctx
                .invalid_value(field, format!("Value {value} must be between {min} and {max}"));
            self.ctx.add_error(error);
        }
        self
    }

    /// Validates that a numeric value is strictly positive.
    pub fn positive<T: PartialOrd + Default + Display>(&mut self, field: &str, value: &T) -> &mut Self {
        if *value <= T::default() {
            let error = self
                .ctx
                .invalid_value(field, format!("Value {value} must be positive"));
            self.ctx.add_error(error);
        }
        self
    }

    /// Validates using a custom predicate.
    pub fn custom<F>(&mut self, field: &str, predicate: F, error_msg: &str) -> &mut Self
    where
        F: FnOnce() -> bool,
    {
        if !predicate() {
            let error = self.ctx.invalid_value(field, error_msg);
            self.ctx.add_error(error);
        }
        self
    }

    /// Validates that a value is a WebSocket URL.
    pub fn valid_ws_url(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.starts_with("ws://") && !value.starts_with("wss://") {
            let error = self
                .ctx
                .invalid_value(field, "Must be a WebSocket URL (ws:// or wss://)");
            self.ctx.add_error(error);
        }
        self
    }

    /// Returns the first collected error, if any.
    pub fn result(&self) -> ValidationResult {
        self.ctx.errors().first().cloned().map_or(Ok(()), Err)
    }
}

/// Source of environment variable values.
pub trait EnvSource {
    /// Looks up a variable by its full name.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

static PROCESS_ENV: ProcessEnv = ProcessEnv;

/// Applies `<PREFIX>_<SECTION>_<FIELD>` overrides to configuration values.
///
/// Values that fail to parse leave the target untouched.
///
/// ```
/// use std::collections::HashMap;
/// use boreas_core::config::EnvOverride;
///
/// let vars = HashMap::from([
///     ("BOREAS_RATE_LIMIT_ENABLED".to_string(), "off".to_string()),
/// ]);
/// let env = EnvOverride::new(&vars, "BOREAS").section("rate_limit");
///
/// let mut enabled = true;
/// env.apply_bool("enabled", &mut enabled);
/// assert!(!enabled);
/// ```
pub struct EnvOverride<'a> {
    source: &'a dyn EnvSource,
    prefix: String,
}

impl<'a> EnvOverride<'a> {
    /// Creates an override reader over `source` with the given prefix.
    #[must_use]
    pub fn new(source: &'a dyn EnvSource, prefix: impl Into<String>) -> Self {
        Self {
            source,
            prefix: prefix.into().to_uppercase(),
        }
    }

    /// Returns a reader scoped to a nested section.
    #[must_use]
    pub fn section(&self, name: &str) -> EnvOverride<'a> {
        EnvOverride {
            source: self.source,
            prefix: format!("{}_{}", self.prefix, name.to_uppercase()),
        }
    }

    /// Returns the full variable name for a field.
    #[must_use]
    pub fn var_name(&self, field: &str) -> String {
        format!("{}_{}", self.prefix, field.to_uppercase())
    }

    fn lookup(&self, field: &str) -> Option<String> {
        self.source.var(&self.var_name(field))
    }

    /// Applies an override to a string value.
    pub fn apply_string(&self, field: &str, target: &mut String) {
        if let Some(value) = self.lookup(field) {
            *target = value;
        }
    }

    /// Applies an override to an optional string value.
    pub fn apply_optional_string(&self, field: &str, target: &mut Option<String>) {
        if let Some(value) = self.lookup(field) {
            *target = Some(value);
        }
    }

    /// Applies an override to any parseable value.
    pub fn apply_number<T: FromStr>(&self, field: &str, target: &mut T) {
        if let Some(value) = self.lookup(field)
            && let Ok(parsed) = value.trim().parse()
        {
            *target = parsed;
        }
    }

    /// Applies an override to a boolean value.
    pub fn apply_bool(&self, field: &str, target: &mut bool) {
        if let Some(value) = self.lookup(field) {
            match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => *target = true,
                "false" | "0" | "no" | "off" => *target = false,
                _ => {}
            }
        }
    }
}

impl EnvOverride<'static> {
    /// Creates an override reader over the process environment.
    #[must_use]
    pub fn from_process(prefix: impl Into<String>) -> Self {
        Self::new(&PROCESS_ENV, prefix)
    }
}
