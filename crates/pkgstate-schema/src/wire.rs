//! Backend command and event payloads.
//!
//! Field names match the package manager bridge exactly
//! (`success`/`message`, `installed`/`updateAvailable`,
//! `current_step`/`detail`), so these types can be exchanged as JSON
//! with a remote or scripted backend unchanged.

use crate::state::OperationStatus;
use serde::{Deserialize, Serialize};

/// Topic name of the unkeyed progress event stream.
pub const PROGRESS_TOPIC: &str = "pacman-progress";

/// Result of `installPackage` / `removePackage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the backend completed the operation.
    pub success: bool,
    /// Human-readable outcome; the failure reason when `success` is false.
    pub message: String,
}

impl CommandResult {
    /// A successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed result carrying the backend's reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// One entry of the `checkAllPackageStates` response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStatusReport {
    /// The package is present on the system.
    pub installed: bool,
    /// A newer version is available from the repositories.
    #[serde(default)]
    pub update_available: bool,
}

impl PackageStatusReport {
    /// Map backend truth onto the state machine.
    ///
    /// An available update only counts for installed packages.
    pub fn status(&self) -> OperationStatus {
        match (self.installed, self.update_available) {
            (true, true) => OperationStatus::UpdateAvailable,
            (true, false) => OperationStatus::Installed,
            (false, _) => OperationStatus::NotInstalled,
        }
    }
}

/// Payload of a [`PROGRESS_TOPIC`] event. Carries no package identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPayload {
    /// Either a bare percentage or a free-form phase label.
    pub current_step: String,
    /// The raw progress line, possibly containing a `(n/m)` counter.
    pub detail: String,
}

impl ProgressPayload {
    /// Build a payload from its two fields.
    pub fn new(current_step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            current_step: current_step.into(),
            detail: detail.into(),
        }
    }
}
