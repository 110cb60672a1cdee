//! pkgstate CLI

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgstate_cli::cmd;
use pkgstate_cli::{Cli, Commands};
use pkgstate_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. RUST_LOG wins; --verbose only changes the fallback.
    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    let json = cli.json;

    match cli.command {
        Commands::Status => cmd::status::status(&config, json).await,
        Commands::Install { packages } => cmd::install::install(&config, &packages, json).await,
        Commands::Remove { packages } => cmd::remove::remove(&config, &packages, json).await,
        Commands::Catalog => cmd::catalog::catalog(&config, json),
    }
}
