//! Effective configuration display.

use anyhow::{Context, Result};
use boreas_core::config::{ConfigFormat, ConfigLoader, Configurable, EnvOverride, Validatable};
use clap::Parser;

use crate::config::{BoreasConfig, ENV_PREFIX};

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Validate the configuration and report the first problem
    #[arg(long)]
    pub validate: bool,

    /// List the environment variables that override settings
    #[arg(long)]
    pub env: bool,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, config: &BoreasConfig) -> Result<()> {
    if args.env {
        for name in BoreasConfig::env_var_names(&EnvOverride::from_process(ENV_PREFIX)) {
            println!("{name}");
        }
        return Ok(());
    }

    if args.validate {
        config.validate().context("configuration is invalid")?;
        println!("Configuration is valid");
        return Ok(());
    }

    let yaml = ConfigLoader::serialize(config, ConfigFormat::Yaml)?;
    print!("{yaml}");
    Ok(())
}
