//! Configuration loading tests
//!
//! Covers:
//! - Missing TOML files fall back to defaults without failing
//! - Malformed TOML is reported as a configuration error
//! - Config path resolution priority (explicit → ENV → platform default)
//!
//! Note: Tests that manipulate ENRICHR_CONFIG are marked #[serial] so they do
//! not race each other.

use enrichr_common::config::{
    load_config, load_toml_config, resolve_config_path, TomlConfig, CONFIG_PATH_ENV,
};
use enrichr_common::logging::init_tracing;
use enrichr_common::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_valid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "service_url = \"http://10.0.0.5:8501\"\nidle_timeout_secs = 45\n",
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.service_url.as_deref(), Some("http://10.0.0.5:8501"));
    assert_eq!(config.idle_timeout_secs, Some(45));
    assert_eq!(config.request_timeout_secs, None);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "service_url = [unterminated").unwrap();

    match load_toml_config(&path) {
        Err(Error::Config(msg)) => assert!(msg.contains("Failed to parse")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_var_used_when_no_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("from-env.toml");
    fs::write(&path, "request_timeout_secs = 5\n").unwrap();

    env::set_var(CONFIG_PATH_ENV, &path);
    let resolved = resolve_config_path(None);
    let config = load_config(None).unwrap();
    env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(resolved, Some(path));
    assert_eq!(config.request_timeout_secs, Some(5));
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let explicit = dir.path().join("explicit.toml");

    env::set_var(CONFIG_PATH_ENV, dir.path().join("ignored.toml"));
    let resolved = resolve_config_path(Some(&explicit));
    env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(resolved, Some(explicit));
}

#[test]
#[serial]
fn test_init_tracing_rejects_bad_level() {
    env::remove_var("RUST_LOG");
    let mut logging = TomlConfig::default().logging;
    logging.level = "enrichr=notalevel".to_string();

    assert!(matches!(init_tracing(&logging), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_init_tracing_twice_is_harmless() {
    env::remove_var("RUST_LOG");
    let logging = TomlConfig::default().logging;

    assert!(init_tracing(&logging).is_ok());
    assert!(init_tracing(&logging).is_ok());
}
