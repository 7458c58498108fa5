//! Config error-message and atomic-write-safety integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use repomirror_core::{config, ConfigError, MirrorConfig};

fn sample() -> MirrorConfig {
    MirrorConfig::new("acme/public".parse().expect("repo"))
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = config::default_path_in(dir.path());
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config not found"));
    assert!(err.to_string().contains("repomirror.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("repomirror.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("repomirror.yaml"), "must contain file path, got: {msg}");
}

#[test]
fn load_missing_target_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("repomirror.yaml");
    file.write_str("version: 1\nsource:\n  branch: dev\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("target"));
}

#[test]
fn load_rejects_invalid_preserve_entry() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("repomirror.yaml");
    file.write_str("version: 1\ntarget:\n  repository: acme/public\npreserve:\n  - ..\n")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn save_cleans_up_tmp_file() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = config::default_path_in(dir.path());
    config::save_at(&path, &sample()).expect("save");

    dir.child("repomirror.yaml.tmp")
        .assert(predicate::path::missing());
    dir.child("repomirror.yaml")
        .assert(predicate::str::contains("acme/public"));
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("ci").join("mirror").join("repomirror.yaml");
    config::save_at(&path, &sample()).expect("save");
    assert!(path.exists());
}

#[test]
fn save_refuses_invalid_config_without_touching_disk() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = config::default_path_in(dir.path());
    let mut cfg = sample();
    cfg.target.branch = String::new();

    let err = config::save_at(&path, &cfg).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    dir.child("repomirror.yaml").assert(predicate::path::missing());
}
