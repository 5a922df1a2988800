//! # Boreas Core
//!
//! Shared building blocks for the Boreas market-stream gateway.
//!
//! This crate provides:
//! - The error hierarchy used across the workspace (transport, decode,
//!   rate-limit misuse, invalid state, subscription and configuration errors)
//! - Configuration loading with YAML/TOML/JSON support, validation helpers
//!   and environment variable overrides

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]

/// Error types and handling
pub mod error;

/// Configuration management
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigFormat, ConfigLoader, Configurable, Validatable};
    pub use crate::error::{
        BoreasError, ConfigError, DecodeError, ErrorSeverity, NetworkError, RateLimitError,
        StateError, SubscriptionError,
    };
}
