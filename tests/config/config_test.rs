//! Coverage for config parsing and path resolution.

use std::path::{Path, PathBuf};

use clearance::config::{config_dir, load_config, Config, DEFAULT_KDF_ITERATIONS};

#[test]
fn config_dir_resolves() {
    let path = match config_dir() {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".clearance"));
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = load_config(&tmp.path().join("absent.toml")).expect("defaults");
    assert_eq!(config.credentials.iterations, DEFAULT_KDF_ITERATIONS);
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.dir.is_none());
}

#[test]
fn parse_full_config() {
    let toml_str = r#"
[audit]
path = "/var/log/clearance/audit.jsonl"
asynchronous = false

[credentials]
iterations = 250000
salt_len = 32

[logging]
level = "clearance=debug"
dir = "/var/log/clearance"
"#;
    let config = Config::from_toml(toml_str).expect("parse");
    assert_eq!(
        config.audit.path.as_deref(),
        Some(Path::new("/var/log/clearance/audit.jsonl"))
    );
    assert!(!config.audit.asynchronous);
    assert_eq!(config.credentials.iterations, 250_000);
    assert_eq!(config.credentials.salt_len, 32);
    assert_eq!(config.logging.level, "clearance=debug");
    assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/clearance")));
    assert!(config.validate().is_ok());
}

#[test]
fn partial_sections_keep_defaults() {
    let config = Config::from_toml("[credentials]\nsalt_len = 24\n").expect("parse");
    assert_eq!(config.credentials.salt_len, 24);
    assert_eq!(config.credentials.iterations, DEFAULT_KDF_ITERATIONS);
    assert!(config.audit.asynchronous);
}

#[test]
fn load_reads_file_and_validates() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[credentials]\nsalt_len = 4\n").expect("write config");
    let err = Config::load(Some(&path)).expect_err("salt too short");
    assert!(err.to_string().contains("salt_len"), "got: {err}");

    std::fs::write(&path, "[credentials]\niterations = 5000\n").expect("write config");
    let config = Config::load(Some(&path)).expect("valid config");
    assert!(config.credentials.iterations >= 1_000);
}

#[test]
fn malformed_toml_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[credentials\niterations = ").expect("write config");
    let err = load_config(&path).expect_err("malformed");
    assert!(err.to_string().contains("failed to parse config"));
}
