//! Progress correlation.
//!
//! Progress events from the backend carry no package identifier, so the
//! target is inferred from the store: it is the package currently in the
//! `Installing` status. Operations are serialized by the orchestrator, so
//! through the public API there is at most one such package. If the store
//! has been driven into holding several, the first by name is chosen and
//! a warning is logged; progress is never fanned out.

use crate::progress::parse_progress;
use crate::store::StateStore;
use pkgstate_schema::{OperationStatus, PackageName, ProgressPayload};

#[derive(Debug, Clone)]
pub struct ProgressCorrelator {
    store: StateStore,
}

impl ProgressCorrelator {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Apply one progress event. Returns the package it was attributed to,
    /// or `None` if the event was discarded.
    pub fn on_progress_event(&self, event: &ProgressPayload) -> Option<PackageName> {
        let installing = self.store.find_by_status(OperationStatus::Installing);
        let target = match installing.as_slice() {
            [] => {
                tracing::debug!(detail = %event.detail, "No package installing, dropping progress event");
                return None;
            }
            [only] => only.clone(),
            [first, ..] => {
                tracing::warn!(
                    candidates = installing.len(),
                    target = %first,
                    "Several packages installing, progress attribution is ambiguous"
                );
                first.clone()
            }
        };

        let progress = parse_progress(&event.current_step, &event.detail);

        // The entry may have left Installing between the lookup and here;
        // record_progress refuses in that case.
        let applied = self
            .store
            .update(&target, |state| {
                state.record_progress(progress, event.detail.as_str())
            })
            .unwrap_or(false);

        if applied {
            tracing::debug!(package = %target, ?progress, "Progress updated");
            Some(target)
        } else {
            tracing::debug!(package = %target, "Package left Installing, dropping progress event");
            None
        }
    }
}
