//! Basic CLI E2E tests.
//!
//! Tests run the built binary with HOME pointed at a scratch directory so
//! the user's real config is never touched.

use std::io::Write;
use std::process::{Command, Stdio};

use mathalarm_core::{PuzzleGate, RngChallengeSource};

/// Run a CLI command with optional stdin and return (code, stdout, stderr).
fn run_cli(home: &std::path::Path, args: &[&str], stdin: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_mathalarm-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("MATHALARM_ENV")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "alarm.required_streak"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");
    assert!(home.path().join(".config/mathalarm/config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "alarm.escalate_after_secs", "60"], "");
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "alarm.escalate_after_secs"], "");
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn test_config_set_rejects_bad_value() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "alarm.min_volume", "9"], "");
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));
}

#[test]
fn test_config_list_is_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"], "");
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["sounds"]["siren_sound"], "nuclear_sound.mp3");
}

#[test]
fn test_drill_solved_with_three_correct_answers() {
    let home = tempfile::tempdir().unwrap();
    let gate = PuzzleGate::default();
    let mut source = RngChallengeSource::seeded(5);
    let answers: String = (0..3)
        .map(|_| format!("{}\n", gate.new_challenge(&mut source).expected))
        .collect();

    let (code, stdout, _) = run_cli(home.path(), &["drill", "--seed", "5"], &answers);
    assert_eq!(code, 0, "stdout: {stdout}");
    assert!(stdout.contains("Correct (1/3)"));
    assert!(stdout.contains("Solved!"));
}

#[test]
fn test_drill_wrong_answer_is_not_an_escape() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(home.path(), &["drill", "--seed", "5"], "0\n");
    assert!(stdout.contains("Incorrect answer!"));
    assert_ne!(code, 0);
    assert!(stderr.contains("before the puzzle was solved"));
}

#[test]
fn test_run_lists_and_quits() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_cli(home.path(), &["run"], "add 25:00\nlist\nquit\n");
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stderr.contains("Invalid time"));
    assert!(stdout.lines().any(|l| l.trim() == "[]"));
}
