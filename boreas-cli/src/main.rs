//! # Boreas CLI
//!
//! Command-line interface for the Boreas market-stream gateway.
//!
//! This CLI provides commands for:
//! - Streaming live market data through the multiplexer
//! - Exercising the request and order rate limiter
//! - Inspecting and validating the effective configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;
mod config;

use anyhow::{Context, Result};
use boreas_core::config::ConfigLoader;
use boreas_telemetry::logging::init_logging;
use boreas_telemetry::metrics::init_metrics;
use clap::{Parser, Subcommand};
use tracing::debug;

use commands::{config as config_cmd, limits, stream};
use config::{BoreasConfig, ENV_PREFIX};

/// Boreas - multiplexed market streams with request admission control
#[derive(Parser)]
#[command(name = "boreas")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path; defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "boreas.yaml", env = "BOREAS_CONFIG")]
    config: String,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to streams and print every message
    Stream(stream::StreamArgs),

    /// Drive the rate limiter locally and print admission timings
    Limits(limits::LimitsArgs),

    /// Print the effective configuration
    Config(config_cmd::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `config --validate` reports problems itself instead of failing the load.
    let validate_on_load = !matches!(cli.command, Commands::Config(_));
    let mut config: BoreasConfig = ConfigLoader::new()
        .with_env_prefix(ENV_PREFIX)
        .with_validation(validate_on_load)
        .load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    if cli.verbose {
        config.logging = config.logging.verbose();
    }

    if let Commands::Config(args) = &cli.command {
        return config_cmd::run(args, &config);
    }

    let _guards = init_logging(&config.logging).context("failed to initialize logging")?;
    init_metrics(&config.metrics).context("failed to initialize metrics")?;
    debug!(path = %cli.config, "Configuration loaded");

    match cli.command {
        Commands::Stream(args) => stream::run(args, &config).await?,
        Commands::Limits(args) => limits::run(args, &config).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
