//! Backend command surface.
//!
//! The core never talks to the package manager directly; it goes through a
//! [`Backend`], so the pacman driver and scripted test backends are
//! interchangeable. Progress is not part of the trait: backends push it
//! into the event bridge they were built with.

pub mod pacman;

use async_trait::async_trait;
use pkgstate_schema::{CommandResult, PackageName, PackageStatusReport};
use std::collections::HashMap;
use thiserror::Error;

pub use pacman::PacmanBackend;

/// The backend call itself could not be completed.
///
/// This is distinct from a backend that ran and reported failure, which is
/// a [`CommandResult`] with `success == false`.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{command}' failed: {message}")]
    Query { command: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Status reports keyed by package, as returned by a batched query.
pub type StatusReports = HashMap<PackageName, PackageStatusReport>;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Install one package. Runs to completion; there is no cancellation.
    async fn install_package(&self, id: &PackageName) -> Result<CommandResult, BackendError>;

    /// Remove one package.
    async fn remove_package(&self, id: &PackageName) -> Result<CommandResult, BackendError>;

    /// Installed / update-available status for every package in `ids`, in
    /// one batched call. Every requested id appears in the result.
    async fn check_all_package_states(
        &self,
        ids: &[PackageName],
    ) -> Result<StatusReports, BackendError>;
}
