//! The tracker: one explicitly owned instance of the whole core.
//!
//! `Tracker::start` builds the store, spawns the event bridge and wires the
//! orchestrator, correlator and reconciler around them. Nothing is global;
//! dropping or shutting down the tracker ends its lifetime.

use crate::backend::Backend;
use crate::bridge::{BridgeHandle, EventBridge};
use crate::config::Config;
use crate::correlator::ProgressCorrelator;
use crate::orchestrator::{OperationError, Orchestrator, PendingOperation};
use crate::reconcile::{ReconcileError, Reconciler};
use crate::store::StateStore;
use pkgstate_schema::{PackageName, PackageState, PackageStateTable};
use std::fmt;
use std::sync::Arc;

pub struct Tracker {
    store: StateStore,
    orchestrator: Orchestrator,
    reconciler: Reconciler,
    bridge: EventBridge,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("store", &self.store)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Start a tracker for the catalog in `config`.
    ///
    /// `make_backend` receives the bridge handle the backend should push
    /// its progress notifications into.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start<B, F>(config: &Config, make_backend: F) -> Self
    where
        B: Backend + 'static,
        F: FnOnce(BridgeHandle) -> B,
    {
        let store = StateStore::new();
        let bridge = EventBridge::spawn(
            config.bridge.capacity,
            ProgressCorrelator::new(store.clone()),
        );
        let backend: Arc<dyn Backend> = Arc::new(make_backend(bridge.handle()));

        let orchestrator =
            Orchestrator::new(store.clone(), Arc::clone(&backend)).with_bridge(bridge.handle());
        let reconciler = Reconciler::new(store.clone(), backend, config.catalog());

        tracing::debug!(
            "Tracker started with {} catalog packages",
            reconciler.catalog().len()
        );
        Self {
            store,
            orchestrator,
            reconciler,
            bridge,
        }
    }

    /// Read-only copy of every tracked package.
    pub fn snapshot(&self) -> PackageStateTable {
        self.store.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<PackageState> {
        self.store.get(id)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn catalog(&self) -> &[PackageName] {
        self.reconciler.catalog()
    }

    /// Handle for delivering backend notifications.
    pub fn bridge(&self) -> BridgeHandle {
        self.bridge.handle()
    }

    /// Re-establish every catalog package's state from the backend.
    ///
    /// # Errors
    ///
    /// Propagates [`ReconcileError`]; the store is unchanged on failure.
    pub async fn refresh_all(&self) -> Result<PackageStateTable, ReconcileError> {
        self.reconciler.check_all().await
    }

    /// See [`Orchestrator::begin_install`].
    pub fn begin_install(&self, id: PackageName) -> Result<PendingOperation, OperationError> {
        self.orchestrator.begin_install(id)
    }

    /// See [`Orchestrator::begin_remove`].
    pub fn begin_remove(&self, id: PackageName) -> Result<PendingOperation, OperationError> {
        self.orchestrator.begin_remove(id)
    }

    /// See [`Orchestrator::install`].
    pub async fn install(&self, id: PackageName) -> Result<PackageState, OperationError> {
        self.orchestrator.install(id).await
    }

    /// See [`Orchestrator::remove`].
    pub async fn remove(&self, id: PackageName) -> Result<PackageState, OperationError> {
        self.orchestrator.remove(id).await
    }

    /// Apply all queued notifications and stop the bridge.
    pub async fn shutdown(self) {
        self.bridge.shutdown().await;
        tracing::debug!("Tracker stopped");
    }
}
