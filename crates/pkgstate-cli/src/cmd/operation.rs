//! Shared driver for install and remove.
//!
//! Packages are processed strictly one after another. Each one is accepted
//! by the orchestrator first (which records the interim state), then the
//! backend call is awaited while the progress line polls the store.

use super::start_tracker;
use crate::ui::{ProgressLine, Theme};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use pkgstate_core::config::CatalogEntry;
use pkgstate_core::{Action, Config, OperationError, PendingOperation, Tracker};
use pkgstate_schema::{OperationStatus, PackageName, PackageState};
use serde::Serialize;
use std::io::IsTerminal;
use std::time::Duration;

/// How often the live progress line is redrawn.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one requested operation, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct OperationReport {
    pub package: PackageName,
    pub action: String,
    /// Final state, absent if the request was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PackageState>,
    /// Why the request was rejected before reaching the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

impl OperationReport {
    fn finished(package: PackageName, action: Action, state: PackageState) -> Self {
        Self {
            package,
            action: action.to_string(),
            state: Some(state),
            rejected: None,
        }
    }

    fn rejected(package: PackageName, action: Action, error: &OperationError) -> Self {
        Self {
            package,
            action: action.to_string(),
            state: None,
            rejected: Some(error.to_string()),
        }
    }

    /// Rejected, or ended in the error status.
    pub fn failed(&self) -> bool {
        self.rejected.is_some()
            || self
                .state
                .as_ref()
                .is_none_or(|s| s.status() == OperationStatus::Error)
    }
}

/// Run `action` for every package in order and report the outcomes.
///
/// # Errors
///
/// Fails on an invalid package name or a failed status query, and after
/// processing everything if any operation was rejected or failed.
pub async fn run_operations(
    config: &Config,
    packages: &[String],
    action: Action,
    json: bool,
) -> Result<()> {
    let names = packages
        .iter()
        .map(|p| PackageName::parse(p))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid package name")?;

    // Track the requested packages too, so removal checks see real state
    let config = with_requested(config, &names);
    let tracker = start_tracker(&config);
    tracker
        .refresh_all()
        .await
        .context("Failed to query package states")?;

    let theme = Theme::default();
    let live = !json && std::io::stdout().is_terminal();
    let verb = match action {
        Action::Install => "installing",
        Action::Remove => "removing",
    };

    let mut reports = Vec::with_capacity(names.len());
    for id in names {
        let pending = match begin(&tracker, action, id.clone()) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::debug!("Rejected {action} of {id}: {e}");
                if !json {
                    println!(
                        "  {} {} {}",
                        theme.icons.error.with(theme.colors.error),
                        id.as_str().with(theme.colors.package_name),
                        e.to_string().with(theme.colors.error)
                    );
                }
                reports.push(OperationReport::rejected(id, action, &e));
                continue;
            }
        };

        let line = ProgressLine::new(theme, verb, live);
        let state = drive(&tracker, pending, &line).await;
        if !json {
            line.finish(&id, &state)?;
        }
        reports.push(OperationReport::finished(id, action, state));
    }

    tracker.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} operation(s) failed", reports.len());
    }
    Ok(())
}

fn begin(
    tracker: &Tracker,
    action: Action,
    id: PackageName,
) -> Result<PendingOperation, OperationError> {
    match action {
        Action::Install => tracker.begin_install(id),
        Action::Remove => tracker.begin_remove(id),
    }
}

/// Await the backend while redrawing the progress line from the store.
async fn drive(tracker: &Tracker, pending: PendingOperation, line: &ProgressLine) -> PackageState {
    let id = pending.id().clone();
    let complete = pending.complete();
    tokio::pin!(complete);

    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
    loop {
        tokio::select! {
            state = &mut complete => return state,
            _ = redraw.tick() => {
                if let Err(e) = line.draw(&id, tracker.get(&id).as_ref()) {
                    tracing::debug!("Failed to draw progress line: {e}");
                }
            }
        }
    }
}

/// `config` with catalog entries added for any requested package it lacks.
fn with_requested(config: &Config, names: &[PackageName]) -> Config {
    let mut config = config.clone();
    for id in names {
        if config.entry(id).is_none() {
            config.packages.push(CatalogEntry {
                name: id.to_string(),
                category: None,
                description: None,
            });
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_failed() {
        let ok = OperationReport::finished(
            "vlc".into(),
            Action::Install,
            PackageState::new(OperationStatus::Installed),
        );
        assert!(!ok.failed());

        let err = OperationReport::finished(
            "vlc".into(),
            Action::Install,
            PackageState::failed("disk full"),
        );
        assert!(err.failed());

        let rejected = OperationReport::rejected(
            "vlc".into(),
            Action::Remove,
            &OperationError::NotRemovable {
                id: "vlc".into(),
                current: Some(OperationStatus::NotInstalled),
            },
        );
        assert!(rejected.failed());
    }

    #[test]
    fn test_report_json_shape() {
        let report = OperationReport::finished(
            "vlc".into(),
            Action::Install,
            PackageState::failed("disk full"),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["package"], "vlc");
        assert_eq!(json["state"]["error"], "disk full");
        assert!(json.get("rejected").is_none());
    }

    #[test]
    fn test_with_requested_adds_missing() {
        let config = Config::from_toml(
            "[[package]]\nname = \"vlc\"\n",
            std::path::Path::new("config.toml"),
        )
        .unwrap();
        let extended = with_requested(&config, &["vlc".into(), "mpv".into()]);
        assert_eq!(extended.catalog(), vec![PackageName::from("vlc"), "mpv".into()]);
    }
}
