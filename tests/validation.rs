//! Output validation tests
//!
//! Run the `nst` binary against a mock speed test server and check the shape
//! of what it prints: the cycle table, the summary, JSON mode and exit codes.

mod common;

use assert_cmd::prelude::*;
use common::{SpeedServer, MEGABYTE};
use regex::Regex;
use serde_json::Value;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary on a blocking thread so the mock server keeps serving
async fn run_nst(base_url: String, args: &[&str]) -> Output {
    let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        Command::cargo_bin("nst")
            .unwrap()
            .current_dir(dir.path())
            .env_remove("SPEED_BASE_URL")
            .env_remove("CYCLE_COUNT")
            .arg("--url")
            .arg(base_url)
            .args(["--download-sizes", "1", "--upload-sizes", "1", "-t", "2", "-p", "4"])
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_plain_output_format() {
    let server = SpeedServer::start().await.healthy(MEGABYTE).await;
    let output = run_nst(server.base_url(), &["-n", "2", "--no-color"]).await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(!stdout.contains('\u{1b}'), "plain output must not carry escape codes");
    assert!(stdout.contains("Network Speed Tester"));

    // Live per-cycle lines
    let cycle_line = Regex::new(r"Cycle \d+: down (\d+ Mbit/s|-) \| up (\d+ Mbit/s|-) \| ping (\d+\.\d ms|-)").unwrap();
    assert_eq!(cycle_line.find_iter(&stdout).count(), 2, "stdout: {}", stdout);

    // Summary block
    let ping_summary = Regex::new(r"Ping \(median\):\s+\d+\.\d ms").unwrap();
    assert!(ping_summary.is_match(&stdout), "stdout: {}", stdout);
    assert!(stdout.contains("2 completed, 0 skipped"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_json_output_is_machine_readable() {
    let server = SpeedServer::start().await.healthy(MEGABYTE).await;
    let output = run_nst(server.base_url(), &["-n", "1", "--json"]).await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["summary"]["completed_cycles"], 1);
    assert_eq!(report["points"].as_array().unwrap().len(), 1);
    assert!(report["summary"]["median_ping_ms"].as_f64().unwrap() > 0.0);
    assert!(report["started_at"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rate_limited_session_exits_with_measurement_error() {
    let server = SpeedServer::start().await.rate_limited().await;
    let output = run_nst(server.base_url(), &["-n", "1", "--no-color"]).await;

    assert_eq!(output.status.code(), Some(6));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();

    assert!(stdout.contains("0 completed, 1 skipped"), "stdout: {}", stdout);
    assert!(stderr.contains("MEASURE"), "stderr: {}", stderr);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_verbose_mode_shows_trials() {
    let server = SpeedServer::start().await.healthy(MEGABYTE).await;
    let output = run_nst(server.base_url(), &["-n", "1", "--no-color", "--verbose", "--sequential"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    let trial_line = Regex::new(r"(?m)^\s+\[1\] (download|upload) 1 MB #\d").unwrap();
    assert_eq!(trial_line.find_iter(&stdout).count(), 4, "stdout: {}", stdout);
}
