//! Install/remove orchestration.
//!
//! Drives the per-package state machine:
//!
//! ```text
//! NotInstalled --install()--> Installing --success--> Installed
//! Installing   --failure----> Error
//! Error        --install()--> Installing
//! Installed    --remove()---> NotInstalled | Error
//! ```
//!
//! Each operation is split in two. `begin_*` checks preconditions and
//! performs the interim transition synchronously, so the caller sees
//! `Installing` before any backend round trip. [`PendingOperation::complete`]
//! then awaits the backend and records the terminal state.
//!
//! Only one operation runs at a time process-wide. Backend progress events
//! carry no package identifier, and this keeps the correlator's "the one
//! installing package" inference sound.

use crate::backend::Backend;
use crate::bridge::BridgeHandle;
use crate::store::StateStore;
use pkgstate_schema::{CommandResult, OperationStatus, PackageName, PackageState};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// The user-triggered operations the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Precondition violations. The store is never modified when one of these
/// is returned; backend failures are not errors here but `Error` states.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OperationError {
    #[error("{id} is already installing")]
    AlreadyInstalling { id: PackageName },

    #[error("Cannot remove {id}: package is {}", describe(.current))]
    NotRemovable {
        id: PackageName,
        current: Option<OperationStatus>,
    },

    #[error("Cannot {requested} {id}: {action} of {active} is still running")]
    Busy {
        id: PackageName,
        requested: Action,
        active: PackageName,
        action: Action,
    },
}

fn describe(status: &Option<OperationStatus>) -> &'static str {
    status.as_ref().map_or("unknown", OperationStatus::as_str)
}

#[derive(Debug, Default)]
struct OperationSlot {
    active: Mutex<Option<(PackageName, Action)>>,
}

/// Releases the operation slot when dropped.
struct SlotClaim {
    slot: Arc<OperationSlot>,
}

impl OperationSlot {
    fn claim(self: &Arc<Self>, id: &PackageName, requested: Action) -> Result<SlotClaim, OperationError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((running, action)) = active.as_ref() {
            if running == id && *action == Action::Install && requested == Action::Install {
                return Err(OperationError::AlreadyInstalling { id: id.clone() });
            }
            return Err(OperationError::Busy {
                id: id.clone(),
                requested,
                active: running.clone(),
                action: *action,
            });
        }
        *active = Some((id.clone(), requested));
        Ok(SlotClaim {
            slot: Arc::clone(self),
        })
    }

    fn current(&self) -> Option<(PackageName, Action)> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for SlotClaim {
    fn drop(&mut self) {
        *self.slot.active.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    store: StateStore,
    backend: Arc<dyn Backend>,
    slot: Arc<OperationSlot>,
    bridge: Option<BridgeHandle>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend.name())
            .field("active", &self.slot.current())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(store: StateStore, backend: Arc<dyn Backend>) -> Self {
        Self {
            store,
            backend,
            slot: Arc::default(),
            bridge: None,
        }
    }

    /// Flush `bridge` before recording each terminal state, so progress
    /// emitted during an operation is applied before it completes.
    pub fn with_bridge(mut self, bridge: BridgeHandle) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// The operation currently in flight, if any.
    pub fn active(&self) -> Option<(PackageName, Action)> {
        self.slot.current()
    }

    /// Move `id` to `Installing` (progress 0) and claim the operation slot.
    ///
    /// Any status other than `Installing` may be installed from, including
    /// `Error` (retry) and `Installed` (reinstall).
    ///
    /// # Errors
    ///
    /// [`OperationError::AlreadyInstalling`] if `id` is installing and
    /// [`OperationError::Busy`] if another operation is running.
    pub fn begin_install(&self, id: PackageName) -> Result<PendingOperation, OperationError> {
        let claim = self.slot.claim(&id, Action::Install)?;

        self.store.set_if(&id, PackageState::installing(), |current| {
            match current.map(PackageState::status) {
                Some(OperationStatus::Installing) => {
                    Err(OperationError::AlreadyInstalling { id: id.clone() })
                }
                _ => Ok(()),
            }
        })?;

        tracing::info!("Installing {id}");
        Ok(PendingOperation::new(self.clone(), id, Action::Install, claim))
    }

    /// Check that `id` can be removed and claim the operation slot.
    ///
    /// No interim status is recorded; the package stays `Installed` (or
    /// `UpdateAvailable`) until the backend answers.
    ///
    /// # Errors
    ///
    /// [`OperationError::NotRemovable`] unless `id` is `Installed` or
    /// `UpdateAvailable`, and [`OperationError::Busy`] if another
    /// operation is running.
    pub fn begin_remove(&self, id: PackageName) -> Result<PendingOperation, OperationError> {
        let claim = self.slot.claim(&id, Action::Remove)?;

        let current = self.store.get(&id).map(|s| s.status());
        if !current.is_some_and(|s| s.is_present()) {
            return Err(OperationError::NotRemovable { id, current });
        }

        tracing::info!("Removing {id}");
        Ok(PendingOperation::new(self.clone(), id, Action::Remove, claim))
    }

    /// Install `id` and wait for the terminal state.
    ///
    /// A backend failure is not an `Err`: it is returned (and stored) as a
    /// state with status `Error` and the message captured verbatim.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::begin_install`].
    pub async fn install(&self, id: PackageName) -> Result<PackageState, OperationError> {
        Ok(self.begin_install(id)?.complete().await)
    }

    /// Remove `id` and wait for the terminal state.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::begin_remove`].
    pub async fn remove(&self, id: PackageName) -> Result<PackageState, OperationError> {
        Ok(self.begin_remove(id)?.complete().await)
    }

    async fn drain_progress(&self) {
        if let Some(bridge) = &self.bridge {
            if let Err(e) = bridge.flush().await {
                tracing::warn!("Could not flush progress events: {e}");
            }
        }
    }
}

/// An accepted operation whose backend call has not been awaited yet.
///
/// Dropping it before [`complete`](Self::complete) has recorded a terminal
/// state (including dropping the `complete` future itself, e.g. on a
/// timeout) releases the operation slot and moves an install that is still
/// `Installing` to `Error`, so the package can be retried or reconciled.
#[must_use = "the backend is only called by `complete`"]
pub struct PendingOperation {
    orchestrator: Orchestrator,
    id: PackageName,
    action: Action,
    finished: bool,
    _claim: SlotClaim,
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("id", &self.id)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl PendingOperation {
    fn new(orchestrator: Orchestrator, id: PackageName, action: Action, claim: SlotClaim) -> Self {
        Self {
            orchestrator,
            id,
            action,
            finished: false,
            _claim: claim,
        }
    }

    pub fn id(&self) -> &PackageName {
        &self.id
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Run the backend request and record the outcome.
    pub async fn complete(mut self) -> PackageState {
        let (id, action) = (&self.id, self.action);
        let backend = &self.orchestrator.backend;

        let outcome = match action {
            Action::Install => backend.install_package(id).await,
            Action::Remove => backend.remove_package(id).await,
        };

        self.orchestrator.drain_progress().await;

        let state = match outcome {
            Ok(CommandResult { success: true, .. }) => {
                let status = match action {
                    Action::Install => OperationStatus::Installed,
                    Action::Remove => OperationStatus::NotInstalled,
                };
                tracing::info!("{action} of {id} succeeded");
                PackageState::new(status)
            }
            Ok(CommandResult {
                success: false,
                message,
            }) => {
                tracing::warn!("{action} of {id} failed: {message}");
                PackageState::failed(message)
            }
            Err(e) => {
                tracing::warn!("{action} of {id} could not run: {e}");
                PackageState::failed(e.to_string())
            }
        };

        self.orchestrator.store.set(self.id.clone(), state.clone());
        self.finished = true;
        state
    }
}

impl Drop for PendingOperation {
    fn drop(&mut self) {
        if self.finished || self.action != Action::Install {
            return;
        }
        // Runs before `_claim` is dropped, so no other operation can start
        // until the entry has left Installing.
        let message = format!("{} of {} was interrupted", self.action, self.id);
        let repaired = self.orchestrator.store.update(&self.id, |state| {
            if state.status() == OperationStatus::Installing {
                *state = PackageState::failed(message);
                true
            } else {
                false
            }
        });
        if repaired == Some(true) {
            tracing::warn!("{} of {} was abandoned before completing", self.action, self.id);
        }
    }
}
