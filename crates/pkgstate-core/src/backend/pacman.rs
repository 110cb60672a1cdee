//! pacman driver.
//!
//! Install and remove run through the configured privilege wrapper
//! (`pkexec` by default) and stream stdout line by line into the event
//! bridge as `pacman-progress` events. Status queries are read-only and run
//! unprivileged.

use super::{Backend, BackendError, StatusReports};
use crate::bridge::BridgeHandle;
use crate::config::BackendConfig;
use async_trait::async_trait;
use pkgstate_schema::{CommandResult, PackageName, PackageStatusReport, ProgressPayload};
use regex::Regex;
use std::collections::HashSet;
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// pacman pads its step counter when there are ten or more steps:
/// `( 1/12) installing vlc`.
static PADDED_COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)/(\d+)\)").expect("static regex"));

static COUNTER_PHASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+/\d+\)\s+(\S+)").expect("static regex"));

#[derive(Debug, Clone)]
pub struct PacmanBackend {
    program: String,
    elevate: Option<String>,
    extra_args: Vec<String>,
    bridge: Option<BridgeHandle>,
}

impl PacmanBackend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            program: config.program.clone(),
            elevate: config.elevate.clone().filter(|e| !e.trim().is_empty()),
            extra_args: config.extra_args.clone(),
            bridge: None,
        }
    }

    /// Forward stdout of install/remove runs to `bridge`.
    pub fn with_bridge(mut self, bridge: BridgeHandle) -> Self {
        self.bridge = Some(bridge);
        self
    }

    fn command(&self, args: &[&str], elevated: bool) -> Command {
        let mut cmd = match self.elevate.as_deref() {
            Some(wrapper) if elevated => {
                let mut c = Command::new(wrapper);
                c.arg(&self.program);
                c
            }
            _ => Command::new(&self.program),
        };
        cmd.args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> BackendError {
        BackendError::Spawn {
            program: self
                .elevate
                .clone()
                .unwrap_or_else(|| self.program.clone()),
            source,
        }
    }

    /// Run a mutating transaction, forwarding stdout as progress.
    async fn transaction(&self, op: &str, id: &PackageName) -> Result<CommandResult, BackendError> {
        let mut args = vec![op];
        if op == "-S" {
            args.push("--needed");
        }
        args.extend(self.extra_args.iter().map(String::as_str));
        args.push(id.as_str());

        tracing::debug!("Running {} {}", self.program, args.join(" "));
        let mut child = self
            .command(&args, true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Drain stderr concurrently so a chatty child can never block on it
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut err) = stderr {
                let _ = err.read_to_string(&mut buf).await;
            }
            buf
        });

        let mut last_line = String::new();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                self.forward(&line).await;
                last_line = line;
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(CommandResult::ok(last_line.trim()))
        } else {
            Ok(CommandResult::failed(failure_message(
                &self.program,
                status,
                &stderr,
            )))
        }
    }

    async fn forward(&self, line: &str) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        if let Err(e) = bridge.progress(progress_payload(line)).await {
            tracing::debug!("Dropping progress line: {e}");
        }
    }

    /// Run a read-only query. `ok_codes` lists exit codes that still count
    /// as success (`-Qu` exits 1 when nothing is upgradable).
    async fn query(&self, args: &[&str], ok_codes: &[i32]) -> Result<String, BackendError> {
        let output = self
            .command(args, false)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let accepted = output.status.success()
            || output.status.code().is_some_and(|c| ok_codes.contains(&c));
        if !accepted {
            return Err(BackendError::Query {
                command: format!("{} {}", self.program, args.join(" ")),
                message: failure_message(
                    &self.program,
                    output.status,
                    &String::from_utf8_lossy(&output.stderr),
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Backend for PacmanBackend {
    fn name(&self) -> &'static str {
        "pacman"
    }

    async fn install_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.transaction("-S", id).await
    }

    async fn remove_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.transaction("-R", id).await
    }

    async fn check_all_package_states(
        &self,
        ids: &[PackageName],
    ) -> Result<StatusReports, BackendError> {
        let installed = parse_installed(&self.query(&["-Q"], &[]).await?);
        let upgradable = parse_upgradable(&self.query(&["-Qu"], &[1]).await?);

        Ok(ids
            .iter()
            .map(|id| {
                let report = PackageStatusReport {
                    installed: installed.contains(id),
                    update_available: upgradable.contains(id),
                };
                (id.clone(), report)
            })
            .collect())
    }
}

/// The stderr text if there is any, otherwise the exit status.
fn failure_message(program: &str, status: ExitStatus, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{program} exited with {status}")
    } else {
        stderr.to_string()
    }
}

/// Names from `pacman -Q` output (`name version` per line).
pub fn parse_installed(output: &str) -> HashSet<PackageName> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(PackageName::from)
        .collect()
}

/// Names from `pacman -Qu` output (`name old -> new [ignored]` per line).
pub fn parse_upgradable(output: &str) -> HashSet<PackageName> {
    output
        .lines()
        .filter(|line| line.contains("->"))
        .filter_map(|line| line.split_whitespace().next())
        .map(PackageName::from)
        .collect()
}

/// Turn one stdout line into a progress payload.
///
/// The step counter is un-padded so `( 3/12)` reads as `(3/12)`, and the
/// word following it (`installing`, `upgrading`, ...) becomes the step.
pub fn progress_payload(line: &str) -> ProgressPayload {
    let detail = PADDED_COUNTER.replace(line.trim(), "($1/$2)").into_owned();
    let step = COUNTER_PHASE
        .captures(&detail)
        .map(|caps| caps[1].to_string())
        .or_else(|| detail.starts_with("::").then(|| "preparing".to_string()))
        .unwrap_or_default();
    ProgressPayload::new(step, detail)
}
