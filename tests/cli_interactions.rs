//! CLI options interaction tests
//!
//! These tests run the `nst` binary and check argument handling, exit codes
//! and the configuration layering between flags and environment variables.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "SPEED_BASE_URL",
    "DOWNLOAD_SIZES_MB",
    "UPLOAD_SIZES_MB",
    "TRIALS_PER_SIZE",
    "PING_ATTEMPTS",
    "CYCLE_COUNT",
    "TIMEOUT_SECONDS",
    "UPLOAD_TIMEOUT_SECONDS",
    "EXECUTION_MODE",
    "PING_METHOD",
    "MAX_CONCURRENCY",
    "ENABLE_COLOR",
];

/// Command isolated from the caller's environment and any `.env` in the repo
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nst").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--cycles"))
        .stdout(predicate::str::contains("--download-sizes"))
        .stdout(predicate::str::contains("--sequential"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--definitely-not-a-flag")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_out_of_range_timeout_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--timeout", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout"));

    create_test_cmd(&dir)
        .args(["--ping-method", "OPTIONS"])
        .assert()
        .code(2);
}

#[test]
fn test_color_flags_conflict() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--color"));
}

#[test]
fn test_zero_concurrency_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--concurrency", "0", "--no-color"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_values_fail_configuration() {
    let dir = TempDir::new().unwrap();

    let cases: &[&[&str]] = &[
        &["--cycles", "0"],
        &["--trials", "0"],
        &["--pings", "0"],
        &["--url", "not a url"],
        &["--url", "ftp://speed.example.com/"],
        &["--download-sizes", "two"],
        &["--upload-sizes=-1"],
        &["--download-sizes", "500"],
    ];

    for args in cases {
        create_test_cmd(&dir)
            .args(*args)
            .arg("--no-color")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("CONFIG").or(predicate::str::contains("VALIDATION")));
    }
}

#[test]
fn test_env_example_prints_every_variable() {
    let dir = TempDir::new().unwrap();
    let mut assert = create_test_cmd(&dir).arg("--env-example").assert().success();
    for var in ENV_VARS {
        assert = assert.stdout(predicate::str::contains(*var));
    }
}

#[test]
fn test_invalid_env_file_value_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "CYCLE_COUNT=zero\n").unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CYCLE_COUNT"));
}

#[test]
fn test_invalid_environment_fails_despite_flag() {
    let dir = TempDir::new().unwrap();

    // Environment values are parsed before flags are applied
    create_test_cmd(&dir)
        .env("PING_METHOD", "TRACE")
        .args(["--ping-method", "GET", "--no-color"])
        .assert()
        .code(1);
}
