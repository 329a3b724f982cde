//! Concurrency tests for the gymlog binary.
//!
//! These tests verify that multiple processes can safely:
//! - Import trainings into the same data directory simultaneously
//! - Create catalog entries without duplicating names
//! - Keep separate users' in-progress sessions apart

use assert_cmd::Command;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gymlog"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_concurrent_imports() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    cli(&dir)
        .args(["exercise", "add", "Bench", "chest", "barbell"])
        .assert()
        .success();

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["import", "--user", &format!("user{}", i % 2)])
                    .write_stdin(format!("1. Bench - {},10; {},8", 40 + i, 45 + i))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    // Header plus two rows per import, no torn lines
    let csv = std::fs::read_to_string(dir.join("data/training_logs.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1 + 6 * 2);
    assert_eq!(csv.lines().filter(|l| l.starts_with("id,")).count(), 1);

    let sessions = std::fs::read_to_string(dir.join("data/sessions.jsonl")).unwrap();
    for line in sessions.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("Corrupt session record");
    }
    assert_eq!(sessions.lines().count(), 6);
}

#[test]
fn test_concurrent_exercise_creation() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["exercise", "add", "Bench", "chest", "barbell"])
                    .output()
                    .expect("Failed to run gymlog")
                    .status
                    .success()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);

    let catalog = std::fs::read_to_string(dir.join("data/exercises.jsonl")).unwrap();
    assert_eq!(catalog.lines().count(), 1);
}

#[test]
fn test_users_sessions_are_independent() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = ["alice", "bob", "carol"]
        .into_iter()
        .map(|user| {
            let dir = dir.clone();
            thread::spawn(move || {
                cli(&dir)
                    .args(["chat", "--user", user])
                    .write_stdin("/start_training\n")
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for user in ["alice", "bob", "carol"] {
        assert!(dir.join(format!("data/sessions/{}.json", user)).exists());
    }
}
