//! Reconciliation with backend ground truth.
//!
//! One batched backend query establishes the status of every catalog
//! package. The result is committed to the store in a single step, or not
//! at all when the query fails.

use crate::backend::{Backend, BackendError};
use crate::store::StateStore;
use pkgstate_schema::{OperationStatus, PackageName, PackageState, PackageStateTable};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to query package states from {backend}: {source}")]
    Query {
        backend: &'static str,
        #[source]
        source: BackendError,
    },
}

#[derive(Clone)]
pub struct Reconciler {
    store: StateStore,
    backend: Arc<dyn Backend>,
    catalog: Arc<[PackageName]>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("backend", &self.backend.name())
            .field("catalog", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: StateStore, backend: Arc<dyn Backend>, catalog: Vec<PackageName>) -> Self {
        Self {
            store,
            backend,
            catalog: catalog.into(),
        }
    }

    /// Packages this reconciler queries.
    pub fn catalog(&self) -> &[PackageName] {
        &self.catalog
    }

    /// Query the backend for every catalog package and commit the result.
    ///
    /// Returns the table as reported by the backend. Entries currently
    /// `Installing` are left to the operation that owns them. Catalog
    /// packages missing from the response are recorded as `NotInstalled`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Query`] if the backend call fails; the
    /// store is not touched in that case.
    pub async fn check_all(&self) -> Result<PackageStateTable, ReconcileError> {
        tracing::debug!(
            "Reconciling {} packages with {}",
            self.catalog.len(),
            self.backend.name()
        );

        let reports = self
            .backend
            .check_all_package_states(&self.catalog)
            .await
            .map_err(|source| ReconcileError::Query {
                backend: self.backend.name(),
                source,
            })?;

        let mut table: PackageStateTable = self
            .catalog
            .iter()
            .map(|id| {
                let status = reports
                    .get(id)
                    .map_or(OperationStatus::NotInstalled, |r| r.status());
                (id.clone(), PackageState::new(status))
            })
            .collect();

        // Extra packages the backend volunteered are tracked too
        for (id, report) in &reports {
            table
                .entry(id.clone())
                .or_insert_with(|| PackageState::new(report.status()));
        }

        let skipped = self.store.apply_batch(table.clone(), |current| {
            current.is_none_or(|s| s.status() != OperationStatus::Installing)
        });
        if !skipped.is_empty() {
            tracing::info!("Left {} in-flight package(s) untouched: {:?}", skipped.len(), skipped);
        }

        tracing::info!("Reconciled {} packages", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StatusReports;
    use async_trait::async_trait;
    use pkgstate_schema::{CommandResult, PackageStatusReport};

    struct FixedBackend(Option<StatusReports>);

    #[async_trait]
    impl Backend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn install_package(&self, _: &PackageName) -> Result<CommandResult, BackendError> {
            Ok(CommandResult::ok(""))
        }

        async fn remove_package(&self, _: &PackageName) -> Result<CommandResult, BackendError> {
            Ok(CommandResult::ok(""))
        }

        async fn check_all_package_states(
            &self,
            _: &[PackageName],
        ) -> Result<StatusReports, BackendError> {
            self.0
                .clone()
                .ok_or_else(|| BackendError::Other("pacman database locked".into()))
        }
    }

    fn report(installed: bool, update_available: bool) -> PackageStatusReport {
        PackageStatusReport {
            installed,
            update_available,
        }
    }

    fn reconciler(store: &StateStore, reports: Option<StatusReports>, catalog: &[&str]) -> Reconciler {
        Reconciler::new(
            store.clone(),
            Arc::new(FixedBackend(reports)),
            catalog.iter().map(|&n| PackageName::from(n)).collect(),
        )
    }

    fn status(store: &StateStore, id: &str) -> Option<OperationStatus> {
        store.get(id).map(|s| s.status())
    }

    #[tokio::test]
    async fn test_fills_store_from_reports() {
        let store = StateStore::new();
        let reports = StatusReports::from([
            ("a".into(), report(true, false)),
            ("b".into(), report(false, false)),
            ("c".into(), report(true, true)),
        ]);
        let table = reconciler(&store, Some(reports), &["a", "b", "c"])
            .check_all()
            .await
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(status(&store, "a"), Some(OperationStatus::Installed));
        assert_eq!(status(&store, "b"), Some(OperationStatus::NotInstalled));
        assert_eq!(status(&store, "c"), Some(OperationStatus::UpdateAvailable));
    }

    #[tokio::test]
    async fn test_overwrites_stale_entries() {
        let store = StateStore::new();
        store.set("a".into(), PackageState::failed("old failure"));

        let reports = StatusReports::from([("a".into(), report(true, false))]);
        reconciler(&store, Some(reports), &["a"]).check_all().await.unwrap();

        assert_eq!(store.get("a"), Some(PackageState::new(OperationStatus::Installed)));
    }

    #[tokio::test]
    async fn test_missing_report_means_not_installed() {
        let store = StateStore::new();
        reconciler(&store, Some(StatusReports::new()), &["ghost"])
            .check_all()
            .await
            .unwrap();
        assert_eq!(status(&store, "ghost"), Some(OperationStatus::NotInstalled));
    }

    #[tokio::test]
    async fn test_failure_leaves_store_unchanged() {
        let store = StateStore::new();
        store.set("a".into(), PackageState::new(OperationStatus::Installed));
        store.set("b".into(), PackageState::failed("disk full"));
        let before = store.snapshot();

        let err = reconciler(&store, None, &["a", "b", "c"])
            .check_all()
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Query { backend: "fixed", .. }));
        assert!(err.to_string().contains("pacman database locked"));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_installing_entry_is_kept() {
        let store = StateStore::new();
        store.set("a".into(), PackageState::installing());

        let reports = StatusReports::from([("a".into(), report(false, false))]);
        let table = reconciler(&store, Some(reports), &["a"]).check_all().await.unwrap();

        assert_eq!(
            table.get("a").map(PackageState::status),
            Some(OperationStatus::NotInstalled)
        );
        assert_eq!(store.get("a"), Some(PackageState::installing()));
    }
}
