//! Unit tests for configuration loading and graceful degradation
//!
//! Tests cover:
//! - Missing TOML files SHALL NOT cause termination
//! - Explicit config paths must exist
//! - Malformed TOML is reported, not silently ignored
//! - Discovery under the user config directory
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate XDG_CONFIG_HOME are marked with #[serial].

use serial_test::serial;
use skyport_common::config::{load_module_config, load_toml_config, LoggingConfig, TomlConfig};
use skyport_common::Error;
use std::env;
use std::path::PathBuf;

#[test]
fn test_full_toml_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skyport-importer.toml");
    std::fs::write(
        &path,
        r#"
bind_addr = "0.0.0.0:8080"
pds_host = "https://pds.example.com"
http_timeout_secs = 10
event_buffer = 8
max_upload_bytes = 1048576
temp_root = "/tmp/skyport"

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:8080"));
    assert_eq!(config.pds_host.as_deref(), Some("https://pds.example.com"));
    assert_eq!(config.http_timeout_secs, Some(10));
    assert_eq!(config.event_buffer, Some(8));
    assert_eq!(config.max_upload_bytes, Some(1_048_576));
    assert_eq!(config.temp_root, Some(PathBuf::from("/tmp/skyport")));
    assert_eq!(
        config.logging,
        LoggingConfig {
            level: "debug".to_string()
        }
    );
}

#[test]
fn test_partial_toml_leaves_rest_unset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "pds_host = \"https://pds.example.com\"\n").unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.pds_host.as_deref(), Some("https://pds.example.com"));
    assert!(config.bind_addr.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "bind_addr = [unterminated").unwrap();

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let result = load_module_config(Some(&path), "skyport-importer");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    env::set_var("XDG_CONFIG_HOME", dir.path());

    // Module name chosen so no system-wide file can exist for it
    let config = load_module_config(None, "skyport-test-nonexistent-module").unwrap();
    assert_eq!(config, TomlConfig::default());

    env::remove_var("XDG_CONFIG_HOME");
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_discovers_file_in_user_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let module_dir = dir.path().join("skyport");
    std::fs::create_dir_all(&module_dir).unwrap();
    std::fs::write(
        module_dir.join("skyport-test-discovery.toml"),
        "event_buffer = 4\n",
    )
    .unwrap();
    env::set_var("XDG_CONFIG_HOME", dir.path());

    let config = load_module_config(None, "skyport-test-discovery").unwrap();
    assert_eq!(config.event_buffer, Some(4));

    env::remove_var("XDG_CONFIG_HOME");
}
