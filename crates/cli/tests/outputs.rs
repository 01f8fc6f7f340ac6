// RegCheck - Register Capture & Comparison Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn nonce() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("regcheck-tests");
    let _ = std::fs::create_dir_all(&dir);

    let path = dir.join(format!("{}-{}.yaml", prefix, nonce()));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .arg("--help")
        .output()
        .expect("Failed to execute regcheck");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--target"));
    assert!(stdout.contains("--snapshot"));
}

#[test]
fn test_cli_default_target_passes() {
    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args(["--seed", "42"])
        .output()
        .expect("Failed to execute regcheck");

    assert!(output.status.success());
    // Mismatch diagnostics go to stdout.
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Expected"));
}

#[test]
fn test_cli_writes_snapshot() {
    let snapshot_path = std::env::temp_dir().join(format!("regcheck-snapshot-{}.json", nonce()));
    let _ = std::fs::remove_file(&snapshot_path);

    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args(["--snapshot", snapshot_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute regcheck");

    assert!(output.status.success());
    assert!(snapshot_path.exists());

    let content = std::fs::read_to_string(&snapshot_path).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot["cpu"]["x"].as_array().unwrap().len(), 32);
    assert_eq!(snapshot["cpu"]["d"].as_array().unwrap().len(), 32);
    // The zero register slot.
    assert_eq!(snapshot["cpu"]["x"][31], 0);
    assert!(snapshot.get("sve").is_none());

    let _ = std::fs::remove_file(&snapshot_path);
}

#[test]
fn test_cli_sve_target() {
    let target = write_temp_file(
        "target-sve",
        r#"
schema_version: "1.0"
name: "sve-512"
features: [fp, neon, sve]
vector_length_bits: 512
ram:
  base: 0x40000000
  size: "128 KiB"
poison:
  general: 0x0badc0de0badc0de
"#,
    );
    let snapshot_path = std::env::temp_dir().join(format!("regcheck-sve-{}.json", nonce()));

    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args([
            "--target",
            target.to_str().unwrap(),
            "--snapshot",
            snapshot_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute regcheck");

    assert!(output.status.success());

    let content = std::fs::read_to_string(&snapshot_path).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot["sve"]["vl_bits"], 512);
    assert_eq!(snapshot["sve"]["p"].as_array().unwrap().len(), 16);
    assert_eq!(snapshot["cpu"]["x"][16], 0x0bad_c0de_0bad_c0de_u64);

    let _ = std::fs::remove_file(&snapshot_path);
}

#[test]
fn test_cli_missing_target_is_config_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args(["--target", "/nonexistent/regcheck-target.yaml"])
        .output()
        .expect("Failed to execute regcheck");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_cli_bad_vector_length_is_config_error() {
    let target = write_temp_file(
        "target-bad-vl",
        r#"
schema_version: "1.0"
name: "bad"
features: [sve]
vector_length_bits: 192
ram:
  base: 0x20000000
  size: "64 KiB"
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args(["--target", target.to_str().unwrap()])
        .output()
        .expect("Failed to execute regcheck");

    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_cli_record_too_large_for_ram() {
    let target = write_temp_file(
        "target-small-ram",
        r#"
schema_version: "1.0"
name: "tiny"
ram:
  base: 0x20000000
  size: "4 KiB"
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_regcheck"))
        .args(["--target", target.to_str().unwrap()])
        .output()
        .expect("Failed to execute regcheck");

    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}
