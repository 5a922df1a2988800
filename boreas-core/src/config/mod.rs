//! Configuration management module.
//!
//! Supports:
//! - YAML, TOML and JSON configuration files
//! - validation with descriptive error messages
//! - environment variable overrides under a common prefix
//!
//! # Example
//!
//! ```rust,ignore
//! use boreas_core::config::{ConfigFormat, ConfigLoader};
//!
//! // Defaults if the file is missing, then BOREAS_* overrides, then validation
//! let config: BoreasConfig = ConfigLoader::new()
//!     .with_env_prefix("BOREAS")
//!     .load("boreas.yaml")?;
//!
//! let config: BoreasConfig = ConfigLoader::new()
//!     .load_str(toml_content, ConfigFormat::Toml)?;
//! ```

mod loader;
mod traits;
pub mod validation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use traits::{Configurable, Validatable};
pub use validation::{
    EnvOverride, EnvSource, ProcessEnv, ValidationContext, ValidationResult, Validator,
};
