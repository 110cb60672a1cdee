//! Status command: reconcile with the backend and print the table
use super::start_tracker;
use crate::ui::Theme;
use crate::ui::list::{status_footer, status_header, status_row};
use anyhow::{Context, Result};
use pkgstate_core::Config;
use pkgstate_schema::OperationStatus;
use std::collections::BTreeMap;

const SUMMARY_ORDER: [OperationStatus; 5] = [
    OperationStatus::Installed,
    OperationStatus::UpdateAvailable,
    OperationStatus::Installing,
    OperationStatus::NotInstalled,
    OperationStatus::Error,
];

/// Query the backend for every catalog package and show the result.
pub async fn status(config: &Config, json: bool) -> Result<()> {
    if config.packages.is_empty() && !json {
        println!();
        println!("  No packages in the catalog.");
        println!("  Add [[package]] entries to your config.toml to track them.");
        return Ok(());
    }

    let tracker = start_tracker(config);
    let refreshed = tracker.refresh_all().await;
    let snapshot: BTreeMap<_, _> = tracker.snapshot().into_iter().collect();
    tracker.shutdown().await;
    refreshed.context("Failed to query package states")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let theme = Theme::default();
    println!();
    println!("{}", status_header(&theme));
    for (name, state) in &snapshot {
        println!("{}", status_row(&theme, name, state));
    }

    let counts: Vec<_> = SUMMARY_ORDER
        .iter()
        .map(|&status| {
            let n = snapshot.values().filter(|s| s.status() == status).count();
            (status, n)
        })
        .collect();
    println!();
    println!("{}", status_footer(&counts));
    println!();
    Ok(())
}
