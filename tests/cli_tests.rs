//! Runs the `keymapping` binary against whatever session the test host has.
//! Assertions hold both with and without a reachable keyboard source.

use std::fs::File;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_keymapping"))
        .args(args)
        .env_remove("KEYMAPPING_TIMEOUT_MS")
        .output()
        .expect("Failed to execute binary")
}

#[test]
fn test_keymap_json_always_has_every_key() {
    let output = run(&["keymap", "--json", "--timeout-ms", "2000"]);
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let entries: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 108);
    assert_eq!(entries[0]["code"], "KeyA");
    assert!(entries.iter().all(|e| e.get("none").is_some()));
}

#[test]
fn test_layout_json_is_object_or_null() {
    let output = run(&["layout", "--json"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let layout: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(layout.is_null() || layout.get("displayName").is_some());
}

#[test]
fn test_layout_name_prints_one_line() {
    let output = run(&["layout-name"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 1);
}

#[test]
fn test_is_iso_prints_a_known_answer() {
    let output = run(&["is-iso"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(["true", "false", "unknown"].contains(&stdout.trim()));
}

#[test]
fn test_keymap_table_reports_counts() {
    let output = run(&["keymap"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Code"));
    assert!(stdout.contains("of 108 keys shown"));
}

#[test]
fn test_zero_timeout_is_rejected() {
    let output = run(&["layout-name", "--timeout-ms", "0"]);
    assert!(!output.status.success());
}

#[test]
fn test_bad_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("query.json");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "{{ not json").unwrap();

    let output = run(&["layout", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_config_file_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("query.json");
    let mut file = File::create(&path).unwrap();
    writeln!(file, r#"{{ "timeout_ms": 1500 }}"#).unwrap();

    let output = run(&["layout-name", "--config", path.to_str().unwrap()]);
    assert!(output.status.success());
}
