//! pkgstate core - package operation state tracking
//!
//! Tracks install/remove operations issued against a package manager
//! backend and keeps a consistent, queryable state per package.
//!
//! # Architecture
//!
//! - **Store**: [`StateStore`] owns the state table; every write replaces a
//!   whole entry.
//! - **Reconciliation**: [`Reconciler`] fills the store from one batched
//!   backend query.
//! - **Orchestration**: [`Orchestrator`] runs install/remove through the
//!   per-package state machine, one operation at a time.
//! - **Correlation**: [`ProgressCorrelator`] attributes unkeyed progress
//!   events to the package being installed.
//! - **Bridge**: [`EventBridge`] delivers backend notifications to the
//!   correlator in order, from a single consumer task.
//!
//! [`Tracker`] wires all of the above together.

pub mod backend;
pub mod bridge;
pub mod config;
pub mod correlator;
pub mod orchestrator;
pub mod paths;
pub mod progress;
pub mod reconcile;
pub mod store;
pub mod tracker;

pub use backend::{Backend, BackendError, PacmanBackend, StatusReports};
pub use bridge::{BridgeError, BridgeHandle, BridgeStats, EventBridge};
pub use config::{Config, ConfigError};
pub use correlator::ProgressCorrelator;
pub use orchestrator::{Action, OperationError, Orchestrator, PendingOperation};
pub use paths::*;
pub use progress::parse_progress;
pub use reconcile::{ReconcileError, Reconciler};
pub use store::StateStore;
pub use tracker::Tracker;

/// Re-exported data model
pub use pkgstate_schema as schema;
