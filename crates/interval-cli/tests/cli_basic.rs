//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs.

use std::process::Command;

/// Run a CLI command against the dev data directory and return output.
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "interval-cli", "--"])
        .args(args)
        .env("INTERVAL_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is JSON")
}

#[test]
fn test_timeline() {
    let (stdout, stderr, code) = run_cli(&["timeline"]);
    assert_eq!(code, 0, "timeline failed: {stderr}");
    let value = json(&stdout);
    assert_eq!(value["total_segments"], 12);
    assert_eq!(value["total_duration_secs"], 180);
    assert_eq!(value["segments"][0]["type"], "work");
    assert_eq!(value["segments"][1]["duration"], 20);
}

#[test]
fn test_resolve_inside_first_segment() {
    let (stdout, stderr, code) = run_cli(&["resolve", "9.5"]);
    assert_eq!(code, 0, "resolve failed: {stderr}");
    let value = json(&stdout);
    assert_eq!(value["done"], false);
    assert_eq!(value["segment_index"], 0);
    assert_eq!(value["seconds_remaining"], 1);
    assert_eq!(value["display"], "0:01");
}

#[test]
fn test_resolve_past_the_end() {
    let (stdout, _, code) = run_cli(&["resolve", "180"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["done"], true);
}

#[test]
fn test_config_get() {
    let (stdout, stderr, code) = run_cli(&["config", "get", "timer.tick_interval_ms"]);
    assert_eq!(code, 0, "config get failed: {stderr}");
    assert!(stdout.trim().parse::<u64>().is_ok());
}

#[test]
fn test_config_get_unknown_key() {
    let (_, stderr, code) = run_cli(&["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_simulate_full_run() {
    let (stdout, stderr, code) = run_cli(&["simulate", "--step-ms", "250"]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    assert!(stdout.contains("finished"));
    assert!(stdout.contains("\"audio_cues\": 48"));
}

#[test]
fn test_simulate_with_background() {
    let (stdout, stderr, code) = run_cli(&[
        "simulate",
        "--background-at",
        "25",
        "--foreground-at",
        "65",
    ]);
    assert_eq!(code, 0, "simulate failed: {stderr}");
    assert!(stdout.contains("background  43 cues handed off"));
    assert!(stdout.contains("foreground  Resumed"));
}
