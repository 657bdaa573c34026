//! Tests for configuration loading and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MCAT_ROOT_FOLDER are marked with #[serial].

use mcat_common::config::{
    database_path, default_root_folder, resolve_root_folder, ServiceConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/mcat-from-env");

    let root = resolve_root_folder(Some(Path::new("/tmp/mcat-from-cli")), ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/mcat-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/mcat-from-env");

    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/mcat-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_empty_env_var_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "");

    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert_ne!(root, PathBuf::from(""));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_default_root_folder_is_named_for_service() {
    let root = default_root_folder();
    assert!(root.to_string_lossy().contains("mcat"));
}

#[test]
fn test_database_path() {
    assert_eq!(
        database_path(Path::new("/srv/mcat")),
        PathBuf::from("/srv/mcat/mcat.db")
    );
}

#[test]
fn test_config_file_in_root_folder() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
port = 8100
upload_dir = "/var/lib/mcat/uploads"
cors_origins = ["https://catalog.example"]
token_expiry_minutes = 30
"#,
    )
    .unwrap();

    let config = ServiceConfig::load(dir.path()).unwrap();
    assert_eq!(config.port, 8100);
    assert_eq!(config.token_expiry_minutes, 30);
    assert_eq!(config.cors_origins, vec!["https://catalog.example"]);
    assert_eq!(
        config.upload_dir_path(dir.path()),
        PathBuf::from("/var/lib/mcat/uploads")
    );
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "port = \"not a number\"").unwrap();

    assert!(ServiceConfig::load(dir.path()).is_err());
}
