//! Configuration file (`config.toml`).
//!
//! ```toml
//! [backend]
//! program = "pacman"
//! elevate = "pkexec"
//! extra_args = ["--noconfirm"]
//!
//! [bridge]
//! capacity = 64
//!
//! [[package]]
//! name = "firefox"
//! category = "Internet"
//! description = "Web browser"
//! ```
//!
//! Every section is optional; missing values fall back to the defaults
//! shown above.

use crate::paths::default_config_path;
use pkgstate_schema::{NameError, PackageName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid catalog entry: {0}")]
    Name(#[from] NameError),

    #[error("Package '{0}' is listed more than once")]
    Duplicate(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub bridge: BridgeConfig,
    #[serde(rename = "package")]
    pub packages: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Package manager executable.
    pub program: String,
    /// Privilege wrapper for install/remove. An empty string runs the
    /// program directly.
    pub elevate: Option<String>,
    /// Arguments appended to every install/remove invocation.
    pub extra_args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: "pacman".to_string(),
            elevate: Some("pkexec".to_string()),
            extra_args: vec!["--noconfirm".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Maximum number of queued, not yet applied, backend notifications.
    pub capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// A package the tracker knows about up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Config {
    /// Parse and validate TOML text. `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and a validation
    /// error for bad package names, duplicates or a zero bridge capacity.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file that must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        tracing::debug!(
            "Loaded {} with {} catalog packages",
            path.display(),
            config.packages.len()
        );
        Ok(config)
    }

    /// Load `explicit` if given, else the default location if it exists,
    /// else the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "backend.program",
                message: "must not be empty".to_string(),
            });
        }
        if self.bridge.capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "bridge.capacity",
                message: "must be at least 1".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.packages {
            let name = PackageName::parse(&entry.name)?;
            if !seen.insert(name.clone()) {
                return Err(ConfigError::Duplicate(name.to_string()));
            }
        }
        Ok(())
    }

    /// Catalog package names in file order.
    pub fn catalog(&self) -> Vec<PackageName> {
        self.packages
            .iter()
            .filter_map(|entry| PackageName::parse(&entry.name).ok())
            .collect()
    }

    /// The catalog entry for `id`, if configured.
    pub fn entry(&self, id: &str) -> Option<&CatalogEntry> {
        self.packages.iter().find(|e| e.name.trim() == id)
    }
}
