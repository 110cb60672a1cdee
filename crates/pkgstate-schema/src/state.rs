//! Per-package operation state.

use crate::types::PackageName;
use serde::Serialize;
use std::collections::HashMap;

/// Lower bound of a progress percentage.
pub const PROGRESS_MIN: f64 = 0.0;

/// Upper bound of a progress percentage.
pub const PROGRESS_MAX: f64 = 100.0;

/// Where a package currently stands in its install/remove lifecycle.
///
/// Exactly one status holds per package at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationStatus {
    /// The backend reports the package as absent.
    NotInstalled,
    /// An install request is in flight.
    Installing,
    /// The backend reports the package as present and current.
    Installed,
    /// Present, but the backend knows a newer version.
    UpdateAvailable,
    /// The last operation failed; see [`PackageState::error`].
    Error,
}

impl OperationStatus {
    /// Lowercase label used in terminal output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInstalled => "not installed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::UpdateAvailable => "update available",
            Self::Error => "error",
        }
    }

    /// Whether the package is present on the system (and thus removable).
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Installed | Self::UpdateAvailable)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full state of one package.
///
/// Fields are private so the ownership rules hold for every value:
/// `progress` and `progress_detail` exist only while the status is
/// [`OperationStatus::Installing`], `error` only while it is
/// [`OperationStatus::Error`]. Each constructor starts from a clean slate,
/// so a status change never carries stale fields along.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageState {
    status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PackageState {
    /// A state with the given status and no auxiliary fields.
    ///
    /// `Installing` starts at progress 0 and `Error` starts with an empty
    /// message, so the result is always well-formed.
    pub fn new(status: OperationStatus) -> Self {
        match status {
            OperationStatus::Installing => Self::installing(),
            OperationStatus::Error => Self::failed(String::new()),
            _ => Self {
                status,
                progress: None,
                progress_detail: None,
                error: None,
            },
        }
    }

    /// Fresh install in flight: progress 0, no detail.
    pub fn installing() -> Self {
        Self {
            status: OperationStatus::Installing,
            progress: Some(PROGRESS_MIN),
            progress_detail: None,
            error: None,
        }
    }

    /// Failed operation with the message captured verbatim.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Error,
            progress: None,
            progress_detail: None,
            error: Some(message.into()),
        }
    }

    /// Current status.
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Progress percentage in `[0, 100]`, present only while installing.
    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    /// Last free-text progress line, present only while installing.
    pub fn progress_detail(&self) -> Option<&str> {
        self.progress_detail.as_deref()
    }

    /// Failure message, present only in the `Error` status.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply a progress tick to an installing package.
    ///
    /// `progress` of `None` keeps the last known value; the detail line is
    /// always replaced. Values are clamped to `[0, 100]` and NaN is
    /// ignored. Returns `false` (leaving `self` untouched) if the package
    /// is not installing.
    pub fn record_progress(&mut self, progress: Option<f64>, detail: impl Into<String>) -> bool {
        if self.status != OperationStatus::Installing {
            return false;
        }
        if let Some(value) = progress.filter(|v| !v.is_nan()) {
            self.progress = Some(value.clamp(PROGRESS_MIN, PROGRESS_MAX));
        }
        self.progress_detail = Some(detail.into());
        true
    }
}

impl From<OperationStatus> for PackageState {
    fn from(status: OperationStatus) -> Self {
        Self::new(status)
    }
}

/// Mapping from package identifier to its current state. No ordering.
pub type PackageStateTable = HashMap<PackageName, PackageState>;
