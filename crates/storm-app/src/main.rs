//! Stormwatch application binary - composition root.
//!
//! 1. Parse the command line
//! 2. Load configuration from TOML
//! 3. Load the subject list
//! 4. Run the requested subcommand over its input file

mod cli;
mod commands;
mod output;
mod reader;
mod report;
mod source;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use storm_core::StormConfig;

use crate::cli::CliArgs;
use crate::commands::Context;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. RUST_LOG wins over the flag, the flag over the config file.
    // The config is not read yet, so start from the flag and reload once it is.
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some() || args.log_level.is_some();
    let initial = from_env.unwrap_or_else(|| EnvFilter::new(args.resolve_log_level("info")));
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Stormwatch v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let config = StormConfig::load_or_default(&config_file);
    if !pinned {
        filter_handle.reload(EnvFilter::new(&config.general.log_level))?;
    }
    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    let subjects_path = args.resolve_subjects_path(&config.general.subjects_file);
    let ctx = Context::new(config, &subjects_path)?;

    if let Err(e) = commands::run(&args.command, &ctx).await {
        tracing::error!(command = args.command.name(), error = %e, "Command failed");
        return Err(e.into());
    }

    tracing::info!(command = args.command.name(), "Done");
    Ok(())
}
