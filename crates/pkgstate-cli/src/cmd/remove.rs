//! Remove command
use super::operation::run_operations;
use anyhow::Result;
use pkgstate_core::{Action, Config};

/// Remove one or more packages, one after the other.
///
/// Packages the backend does not report as installed are rejected without
/// invoking it.
pub async fn remove(config: &Config, packages: &[String], json: bool) -> Result<()> {
    run_operations(config, packages, Action::Remove, json).await
}
