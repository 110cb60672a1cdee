//! Event bridge - ordered delivery of backend notifications
//!
//! Backend notifications arrive asynchronously from whatever task is driving
//! the package manager. The bridge funnels them through one bounded channel
//! into a single consumer task, which hands each one to the
//! [`ProgressCorrelator`] in arrival order.
//!
//! 1. **Senders (many)**: backends `clone()` a [`BridgeHandle`] and push
//!    events. A full channel makes the sender wait rather than drop events.
//!
//! 2. **Receiver (one)**: the consumer task owns the receiver. Because it
//!    processes events one by one, two progress events can never be applied
//!    out of order or concurrently.
//!
//! 3. **Barrier**: [`BridgeHandle::flush`] enqueues a marker and waits for the
//!    consumer to reach it, so everything sent before the call has been
//!    applied when it returns.

use crate::correlator::ProgressCorrelator;
use pkgstate_schema::{PROGRESS_TOPIC, ProgressPayload};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Event bridge has shut down")]
    Closed,

    #[error("Malformed '{topic}' payload: {source}")]
    Payload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Events that can be sent to the bridge
pub enum BridgeEvent {
    /// A `pacman-progress` notification
    Progress(ProgressPayload),
    /// Reply once every earlier event has been applied
    Sync(oneshot::Sender<()>),
    /// Stop the consumer task
    Shutdown,
}

impl fmt::Debug for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress(payload) => f.debug_tuple("Progress").field(payload).finish(),
            Self::Sync(_) => write!(f, "Sync"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Progress events processed by the consumer so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Attributed to an installing package.
    pub applied: u64,
    /// Discarded because no package was installing.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    dropped: AtomicU64,
}

/// A handle to the bridge that is Send + Sync and Clone.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: mpsc::Sender<BridgeEvent>,
    counters: Arc<Counters>,
}

impl fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

impl BridgeHandle {
    async fn send(&self, event: BridgeEvent) -> Result<(), BridgeError> {
        self.sender.send(event).await.map_err(|_| BridgeError::Closed)
    }

    /// Queue a progress notification.
    pub async fn progress(&self, payload: ProgressPayload) -> Result<(), BridgeError> {
        self.send(BridgeEvent::Progress(payload)).await
    }

    /// Queue a notification given as a topic plus JSON payload.
    ///
    /// Topics other than [`PROGRESS_TOPIC`] are ignored.
    pub async fn emit(&self, topic: &str, payload: serde_json::Value) -> Result<(), BridgeError> {
        if topic != PROGRESS_TOPIC {
            tracing::debug!(topic, "Ignoring notification on unknown topic");
            return Ok(());
        }
        let payload =
            serde_json::from_value(payload).map_err(|source| BridgeError::Payload {
                topic: topic.to_string(),
                source,
            })?;
        self.progress(payload).await
    }

    /// Wait until every event queued before this call has been applied.
    pub async fn flush(&self) -> Result<(), BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.send(BridgeEvent::Sync(tx)).await?;
        rx.await.map_err(|_| BridgeError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Counts of processed progress events. Events still queued are not
    /// included; call [`flush`](Self::flush) first for an exact figure.
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            applied: self.counters.applied.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Owner of the consumer task.
pub struct EventBridge {
    handle: BridgeHandle,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl EventBridge {
    /// Spawn the consumer task on the current tokio runtime.
    ///
    /// `capacity` bounds the number of queued events (minimum 1).
    pub fn spawn(capacity: usize, correlator: ProgressCorrelator) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let task = tokio::spawn(run_event_loop(
            correlator,
            receiver,
            Arc::clone(&counters),
        ));

        Self {
            handle: BridgeHandle { sender, counters },
            task: Some(task),
        }
    }

    /// Get a cloneable handle for this bridge
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Stop the consumer after it drains everything already queued.
    pub async fn shutdown(mut self) {
        // A closed channel means the task is already gone
        let _ = self.handle.sender.send(BridgeEvent::Shutdown).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Event bridge task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.handle.sender.try_send(BridgeEvent::Shutdown);
        }
    }
}

/// Main event loop for the bridge.
///
/// Runs until shutdown or until every handle has been dropped.
async fn run_event_loop(
    correlator: ProgressCorrelator,
    mut receiver: mpsc::Receiver<BridgeEvent>,
    counters: Arc<Counters>,
) {
    while let Some(event) = receiver.recv().await {
        match event {
            BridgeEvent::Progress(payload) => {
                let counter = if correlator.on_progress_event(&payload).is_some() {
                    &counters.applied
                } else {
                    &counters.dropped
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            BridgeEvent::Sync(tx) => {
                // All previous events are processed because the channel is FIFO
                let _ = tx.send(());
            }
            BridgeEvent::Shutdown => break,
        }
    }
    tracing::debug!(
        applied = counters.applied.load(Ordering::Relaxed),
        dropped = counters.dropped.load(Ordering::Relaxed),
        "Event bridge stopped"
    );
}
