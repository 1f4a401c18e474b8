//! Unit tests for configuration resolution and logging defaults
//!
//! Tests that manipulate CLF_CONFIG are marked with #[serial] so they run
//! sequentially, not in parallel.

use clf_common::config::{load_toml_config, resolve_config_path, LoggingConfig, CONFIG_ENV_VAR};
use clf_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct SampleConfig {
    name: String,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_cli_argument_takes_precedence_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/clf-from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/clf-from-cli.toml"))).unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/clf-from-cli.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/clf-from-env.toml");

    let resolved = resolve_config_path(None).unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/clf-from-env.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    // Falls through to platform locations; either a platform file exists or
    // resolution fails with a Config error, never the blank value.
    match resolve_config_path(None) {
        Ok(path) => assert_ne!(path, PathBuf::from("   ")),
        Err(e) => assert!(matches!(e, Error::Config(_))),
    }

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_load_toml_config_with_logging_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "name = \"review\"\n").unwrap();

    let config: SampleConfig = load_toml_config(&path).unwrap();
    assert_eq!(config.name, "review");
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
}

#[test]
fn test_load_toml_config_with_logging_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "name = \"review\"\n[logging]\nlevel = \"debug\"\nfile = \"/tmp/clf.log\"\n",
    )
    .unwrap();

    let config: SampleConfig = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/clf.log")));
}

#[test]
fn test_load_missing_file_is_config_error() {
    let result: Result<SampleConfig, _> = load_toml_config(Path::new("/nonexistent/clf.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_invalid_toml_is_toml_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "name = \n").unwrap();

    let result: Result<SampleConfig, _> = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Toml(_))));
}
