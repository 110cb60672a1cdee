//! pkgstate - package operation tracker
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for `pkgstate-core`.
//!
//! # Overview
//!
//! `pkgstate` keeps a per-package view of what the package manager is doing:
//! which catalog packages are installed or upgradable, which one is being
//! installed right now and how far along it is, and why the last operation
//! failed. Install and remove go through pacman (wrapped in `pkexec` by
//! default) and the live progress line is fed by pacman's own output.
//!
//! # Configuration
//!
//! ```text
//! $PKGSTATE_CONFIG                       # explicit file, same as --config
//! $PKGSTATE_HOME/config.toml             # if PKGSTATE_HOME is set
//! ~/.config/pkgstate/config.toml         # default
//! ```

pub mod cmd;
pub mod ui;

pub use pkgstate_core::paths::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pkgstate")]
#[command(author, version, about = "pkgstate - track pacman package operations")]
pub struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "PKGSTATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Query the backend and show the state of every catalog package
    Status,
    /// Install one or more packages, one at a time
    Install {
        /// Package name(s)
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// Remove one or more installed packages, one at a time
    Remove {
        /// Package name(s)
        #[arg(required = true)]
        packages: Vec<String>,
    },
    /// List the configured package catalog without querying the backend
    Catalog,
}
