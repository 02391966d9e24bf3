//! Logging behaviour of the postcraft binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_postcraft"))
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("POSTCRAFT_LOG")
        .env_remove("POSTCRAFT_LOG_MODULES")
        .env_remove("POSTCRAFT_LOG_FORMAT")
        .env_remove("POSTCRAFT_LOG_OUTPUT")
        .arg("--project")
        .arg(home)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn log_file_flag_writes_startup_and_command_events() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("logs").join("postcraft.log");

    let output = run(
        temp.path(),
        &["--log-level", "info", "--log-file", log.to_str().unwrap(), "ratios"],
    );

    assert!(
        output.status.success(),
        "ratios should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("Postcraft CLI starting"));
    assert!(content.contains("Command completed"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("21:9"));
}

#[test]
fn json_format_emits_one_object_per_line() {
    let temp = TempDir::new().unwrap();
    let log = temp.path().join("postcraft.jsonl");

    let output = run(
        temp.path(),
        &[
            "--log-level",
            "info",
            "--log-format",
            "json",
            "--log-file",
            log.to_str().unwrap(),
            "ratios",
        ],
    );
    assert!(output.status.success());

    let content = fs::read_to_string(&log).unwrap();
    assert!(!content.trim().is_empty());
    for line in content.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(event.get("timestamp").is_some());
        assert!(event.get("level").is_some());
    }
}

#[test]
fn quiet_keeps_stderr_clean() {
    let temp = TempDir::new().unwrap();
    let output = run(temp.path(), &["--quiet", "ratios"]);
    assert!(output.status.success());
    assert!(output.stderr.is_empty());
}
