//! End-to-end lifecycle tests against a scripted in-process backend.

use async_trait::async_trait;
use pkgstate_core::schema::{
    CommandResult, OperationStatus, PackageName, PackageState, PackageStatusReport,
    ProgressPayload,
};
use pkgstate_core::{
    Backend, BackendError, BridgeHandle, BridgeStats, Config, OperationError, ReconcileError, StatusReports,
    Tracker,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Backend whose answers are set up by the test.
///
/// Install/remove wait for `release`, emit the queued progress lines, then
/// return the scripted result for that package (success if none).
struct ScriptedBackend {
    bridge: BridgeHandle,
    release: Notify,
    gated: bool,
    reports: Mutex<Option<StatusReports>>,
    results: Mutex<HashMap<String, Result<CommandResult, String>>>,
    progress: Mutex<Vec<ProgressPayload>>,
}

impl ScriptedBackend {
    fn new(bridge: BridgeHandle, gated: bool) -> Self {
        Self {
            bridge,
            release: Notify::new(),
            gated,
            reports: Mutex::new(None),
            results: Mutex::new(HashMap::new()),
            progress: Mutex::new(Vec::new()),
        }
    }

    async fn run(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        if self.gated {
            self.release.notified().await;
        }
        let lines: Vec<ProgressPayload> = self.progress.lock().unwrap().drain(..).collect();
        for payload in lines {
            self.bridge.progress(payload).await.unwrap();
        }
        match self.results.lock().unwrap().get(id.as_str()).cloned() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(BackendError::Other(message)),
            None => Ok(CommandResult::ok("done")),
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn install_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.run(id).await
    }

    async fn remove_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.run(id).await
    }

    async fn check_all_package_states(
        &self,
        _: &[PackageName],
    ) -> Result<StatusReports, BackendError> {
        self.reports
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::Other("unable to lock database".into()))
    }
}

fn config(catalog: &[&str]) -> Config {
    let mut text = String::new();
    for name in catalog {
        text.push_str(&format!("[[package]]\nname = \"{name}\"\n"));
    }
    Config::from_toml(&text, std::path::Path::new("test.toml")).unwrap()
}

/// Start a tracker and keep a handle on the backend it was given.
fn start(catalog: &[&str], gated: bool) -> (Tracker, Arc<ScriptedBackend>) {
    let slot = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&slot);
    let tracker = Tracker::start(&config(catalog), move |bridge| {
        let backend = Arc::new(ScriptedBackend::new(bridge, gated));
        *captured.lock().unwrap() = Some(Arc::clone(&backend));
        SharedBackend(backend)
    });
    let backend = slot.lock().unwrap().take().unwrap();
    (tracker, backend)
}

/// Lets the test keep its own `Arc` to the backend the tracker owns.
struct SharedBackend(Arc<ScriptedBackend>);

#[async_trait]
impl Backend for SharedBackend {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn install_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.0.install_package(id).await
    }

    async fn remove_package(&self, id: &PackageName) -> Result<CommandResult, BackendError> {
        self.0.remove_package(id).await
    }

    async fn check_all_package_states(
        &self,
        ids: &[PackageName],
    ) -> Result<StatusReports, BackendError> {
        self.0.check_all_package_states(ids).await
    }
}

fn report(installed: bool) -> PackageStatusReport {
    PackageStatusReport {
        installed,
        update_available: false,
    }
}

fn status(tracker: &Tracker, id: &str) -> Option<OperationStatus> {
    tracker.get(id).map(|s| s.status())
}

#[tokio::test]
async fn test_install_with_progress_end_to_end() {
    let (tracker, backend) = start(&["A", "B"], true);
    *backend.reports.lock().unwrap() = Some(StatusReports::from([
        ("A".into(), report(true)),
        ("B".into(), report(false)),
    ]));

    tracker.refresh_all().await.unwrap();
    assert_eq!(status(&tracker, "A"), Some(OperationStatus::Installed));
    assert_eq!(status(&tracker, "B"), Some(OperationStatus::NotInstalled));

    let pending = tracker.begin_install("B".into()).unwrap();
    assert_eq!(tracker.get("B"), Some(PackageState::installing()));

    let bridge = tracker.bridge();
    bridge
        .progress(ProgressPayload::new("", "(2/5)"))
        .await
        .unwrap();
    bridge.flush().await.unwrap();

    let state = tracker.get("B").unwrap();
    assert_eq!(state.status(), OperationStatus::Installing);
    assert_eq!(state.progress(), Some(40.0));
    assert_eq!(state.progress_detail(), Some("(2/5)"));

    backend.release.notify_one();
    let done = pending.complete().await;
    assert_eq!(done, PackageState::new(OperationStatus::Installed));
    assert_eq!(tracker.get("B"), Some(done));
    assert_eq!(status(&tracker, "A"), Some(OperationStatus::Installed));

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_failure_then_retry() {
    let (tracker, backend) = start(&[], true);
    backend.results.lock().unwrap().insert(
        "C".into(),
        Ok(CommandResult::failed("disk full")),
    );

    let pending = tracker.begin_install("C".into()).unwrap();
    backend.release.notify_one();
    let state = pending.complete().await;
    assert_eq!(state, PackageState::failed("disk full"));
    assert_eq!(tracker.get("C").unwrap().error(), Some("disk full"));

    let _retry = tracker.begin_install("C".into()).unwrap();
    assert_eq!(tracker.get("C"), Some(PackageState::installing()));

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_invocation_failure_is_recorded() {
    let (tracker, backend) = start(&[], false);
    backend
        .results
        .lock()
        .unwrap()
        .insert("C".into(), Err("failed to spawn pkexec".into()));

    let state = tracker.install("C".into()).await.unwrap();
    assert_eq!(state.status(), OperationStatus::Error);
    assert_eq!(state.error(), Some("failed to spawn pkexec"));

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_backend_progress_applied_before_completion() {
    let (tracker, backend) = start(&[], false);
    backend.progress.lock().unwrap().extend([
        ProgressPayload::new("", "resolving dependencies..."),
        ProgressPayload::new("installing", "(1/1) installing vlc"),
    ]);

    tracker.install("vlc".into()).await.unwrap();
    assert_eq!(status(&tracker, "vlc"), Some(OperationStatus::Installed));

    // Both lines were attributed to vlc while it was still installing,
    // before the terminal state was written
    let bridge = tracker.bridge();
    assert_eq!(bridge.stats(), BridgeStats { applied: 2, dropped: 0 });

    // Nothing from the first install may leak into the next one
    let _pending = tracker.begin_install("mpv".into()).unwrap();
    bridge.flush().await.unwrap();
    assert_eq!(tracker.get("mpv"), Some(PackageState::installing()));
    assert_eq!(bridge.stats(), BridgeStats { applied: 2, dropped: 0 });

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_progress_without_installing_package_is_ignored() {
    let (tracker, backend) = start(&["A"], false);
    *backend.reports.lock().unwrap() = Some(StatusReports::from([("A".into(), report(true))]));
    tracker.refresh_all().await.unwrap();
    let before = tracker.snapshot();

    let bridge = tracker.bridge();
    bridge.progress(ProgressPayload::new("50", "(1/2)")).await.unwrap();
    bridge.flush().await.unwrap();

    assert_eq!(tracker.snapshot(), before);
    assert_eq!(bridge.stats(), BridgeStats { applied: 0, dropped: 1 });
    tracker.shutdown().await;
}

#[tokio::test]
async fn test_reconcile_failure_leaves_store_unchanged() {
    let (tracker, backend) = start(&["A", "B"], false);
    *backend.reports.lock().unwrap() = Some(StatusReports::from([
        ("A".into(), report(true)),
        ("B".into(), report(false)),
    ]));
    tracker.refresh_all().await.unwrap();
    let before = tracker.snapshot();

    *backend.reports.lock().unwrap() = None;
    let err = tracker.refresh_all().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Query { backend: "scripted", .. }));
    assert_eq!(tracker.snapshot(), before);

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_remove_requires_installed() {
    let (tracker, backend) = start(&["A", "B"], false);
    *backend.reports.lock().unwrap() = Some(StatusReports::from([
        ("A".into(), report(true)),
        ("B".into(), report(false)),
    ]));
    tracker.refresh_all().await.unwrap();

    let err = tracker.remove("B".into()).await.unwrap_err();
    assert!(matches!(err, OperationError::NotRemovable { .. }));
    assert_eq!(status(&tracker, "B"), Some(OperationStatus::NotInstalled));

    let state = tracker.remove("A".into()).await.unwrap();
    assert_eq!(state.status(), OperationStatus::NotInstalled);

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_only_one_operation_at_a_time() {
    let (tracker, backend) = start(&[], true);

    let first = tracker.begin_install("vlc".into()).unwrap();
    let err = tracker.begin_install("mpv".into()).unwrap_err();
    assert!(matches!(err, OperationError::Busy { .. }));
    assert!(tracker.get("mpv").is_none());

    backend.release.notify_one();
    first.complete().await;

    backend.release.notify_one();
    let state = tracker.install("mpv".into()).await.unwrap();
    assert_eq!(state.status(), OperationStatus::Installed);

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_timed_out_install_can_be_retried() {
    let (tracker, backend) = start(&["vlc"], true);
    *backend.reports.lock().unwrap() = Some(StatusReports::from([("vlc".into(), report(false))]));

    // The gate is never opened, so the install cannot finish in time
    let result = tokio::time::timeout(
        std::time::Duration::from_millis(10),
        tracker.install("vlc".into()),
    )
    .await;
    assert!(result.is_err());
    assert!(tracker.orchestrator().active().is_none());
    assert_eq!(status(&tracker, "vlc"), Some(OperationStatus::Error));

    tracker.refresh_all().await.unwrap();
    assert_eq!(status(&tracker, "vlc"), Some(OperationStatus::NotInstalled));

    let pending = tracker.begin_install("vlc".into()).unwrap();
    assert_eq!(tracker.get("vlc"), Some(PackageState::installing()));
    backend.release.notify_one();
    assert_eq!(
        pending.complete().await,
        PackageState::new(OperationStatus::Installed)
    );

    tracker.shutdown().await;
}
