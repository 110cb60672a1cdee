//! Smoke tests for the `pkgstate` binary.
//!
//! None of these reach the package manager: they cover argument parsing,
//! configuration loading and the commands that work offline.

use std::path::Path;
use std::process::{Command, Output};

fn pkgstate(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pkgstate"))
        .args(args)
        .env("PKGSTATE_HOME", home)
        .env_remove("PKGSTATE_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pkgstate")
}

fn write_config(dir: &Path, text: &str) -> String {
    let path = dir.join("config.toml");
    std::fs::write(&path, text).unwrap();
    path.display().to_string()
}

#[test]
fn test_help() {
    let home = tempfile::tempdir().unwrap();
    let out = pkgstate(home.path(), &["--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for sub in ["status", "install", "remove", "catalog"] {
        assert!(stdout.contains(sub), "missing {sub} in help");
    }
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    let out = pkgstate(home.path(), &["--version"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_install_requires_package() {
    let home = tempfile::tempdir().unwrap();
    let out = pkgstate(home.path(), &["install"]);
    assert!(!out.status.success());
}

#[test]
fn test_catalog_from_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "[[package]]\nname = \"firefox\"\ncategory = \"Internet\"\n\n[[package]]\nname = \"vlc\"\n",
    );

    let out = pkgstate(dir.path(), &["--config", &config, "catalog"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("firefox"));
    assert!(stdout.contains("Internet"));
    assert!(stdout.contains("vlc"));
}

#[test]
fn test_catalog_json_from_home() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "[[package]]\nname = \"vlc\"\ndescription = \"Media player\"\n",
    );

    let out = pkgstate(home.path(), &["--json", "catalog"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json[0]["name"], "vlc");
    assert_eq!(json[0]["description"], "Media player");
}

#[test]
fn test_empty_catalog() {
    let home = tempfile::tempdir().unwrap();
    let out = pkgstate(home.path(), &["catalog"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No packages in the catalog"));

    let out = pkgstate(home.path(), &["status"]);
    assert!(out.status.success());
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "[bridge]\ncapacity = 0\n");

    let out = pkgstate(dir.path(), &["--config", &config, "catalog"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("bridge.capacity"));
}

#[test]
fn test_missing_config_flag_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let out = pkgstate(dir.path(), &["--config", missing.to_str().unwrap(), "catalog"]);
    assert!(!out.status.success());
}

#[test]
fn test_bad_package_name_is_rejected_before_backend() {
    let home = tempfile::tempdir().unwrap();
    let out = pkgstate(home.path(), &["install", "two words"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid package name"));
}
