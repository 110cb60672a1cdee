use dirs::config_dir;
use std::path::PathBuf;

/// Returns the pkgstate configuration directory, or None if it cannot be resolved.
///
/// `PKGSTATE_HOME` overrides the platform default (`~/.config/pkgstate`).
pub fn try_pkgstate_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PKGSTATE_HOME") {
        return Some(PathBuf::from(val));
    }
    config_dir().map(|d| d.join("pkgstate"))
}

/// Default configuration file: `<home>/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    try_pkgstate_home().map(|home| home.join("config.toml"))
}
