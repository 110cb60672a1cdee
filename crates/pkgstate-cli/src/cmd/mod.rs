//! Subcommand implementations

pub mod catalog;
pub mod install;
pub mod operation;
pub mod remove;
pub mod status;

use pkgstate_core::{Config, PacmanBackend, Tracker};

/// Start a tracker driving pacman as configured.
pub(crate) fn start_tracker(config: &Config) -> Tracker {
    Tracker::start(config, |bridge| {
        PacmanBackend::new(&config.backend).with_bridge(bridge)
    })
}
