//! Install command
use super::operation::run_operations;
use anyhow::Result;
use pkgstate_core::{Action, Config};

/// Install one or more packages, one after the other.
pub async fn install(config: &Config, packages: &[String], json: bool) -> Result<()> {
    run_operations(config, packages, Action::Install, json).await
}
