//! Integration tests for the nurseflow binary.
//!
//! These tests verify end-to-end behavior including:
//! - Patient and medication management
//! - Dose logging and schedule advancement
//! - History, dashboard and CSV export
//! - Validation and missing-reference handling

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("nurseflow"))
}

/// Pull the id out of a "✓ Added ... (<uuid>)" line
fn extract_id(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .find(|l| l.contains('('))
        .expect("no id line in output");
    let start = line.rfind('(').unwrap();
    let end = line.rfind(')').unwrap();
    line[start + 1..end].to_string()
}

fn add_patient(data_dir: &Path, name: &str) -> String {
    let output = cli()
        .args(["patient", "add", name, "--room", "12B"])
        .arg("--data-dir")
        .arg(data_dir)
        .output()
        .expect("failed to run patient add");
    assert!(output.status.success());
    extract_id(&output.stdout)
}

fn add_med(data_dir: &Path, patient_id: &str, name: &str, frequency: &str) -> String {
    let output = cli()
        .args([
            "med",
            "add",
            "--patient",
            patient_id,
            "--name",
            name,
            "--dose",
            "500mg",
            "--route",
            "PO",
            "--frequency",
            frequency,
        ])
        .arg("--data-dir")
        .arg(data_dir)
        .output()
        .expect("failed to run med add");
    assert!(output.status.success());
    extract_id(&output.stdout)
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Medication scheduling and administration tracker",
        ));
}

#[test]
fn test_serve_advances_schedule_and_logs() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    let med_id = add_med(data_dir, &patient_id, "Amoxicillin", "qid");

    cli()
        .args(["serve", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged SERVED"))
        .stdout(predicate::str::contains("Next due:"));

    // The dose log holds exactly the one entry
    cli()
        .args(["history", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("SERVED"));

    let log = fs::read_to_string(data_dir.join("doses.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);
    let entry: serde_json::Value = serde_json::from_str(log.lines().next().unwrap()).unwrap();
    assert_eq!(entry["status"], "SERVED");
    assert_eq!(entry["medication_id"], med_id.as_str());

    // And the dashboard now shows the pending dose
    cli()
        .arg("due")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Amoxicillin"));
}

#[test]
fn test_stat_medication_completes_after_one_dose() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    let med_id = add_med(data_dir, &patient_id, "Furosemide", "stat");

    cli()
        .args(["serve", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Course complete"));

    cli()
        .arg("due")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending doses"));
}

#[test]
fn test_miss_skips_slot() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    let med_id = add_med(data_dir, &patient_id, "Metformin", "bd");

    cli()
        .args(["miss", &med_id, "--notes", "refused"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged MISSED"));

    cli()
        .args(["history", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("MISSED"))
        .stdout(predicate::str::contains("refused"));
}

#[test]
fn test_invalid_custom_interval_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");

    cli()
        .args([
            "med",
            "add",
            "--patient",
            &patient_id,
            "--name",
            "Amoxicillin",
            "--dose",
            "500mg",
            "--route",
            "PO",
            "--frequency",
            "custom:0",
        ])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .failure();
}

#[test]
fn test_serve_completed_medication_is_rejected() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    let med_id = add_med(data_dir, &patient_id, "Amoxicillin", "qid");

    cli()
        .args(["med", "complete", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["serve", &med_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("completed; dose not logged"));

    // The completed course stays off the schedule and nothing was logged
    assert!(!data_dir.join("doses.jsonl").exists());
    cli()
        .arg("due")
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending doses"));
}

#[test]
fn test_unknown_medication_is_noop() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .args(["serve", "00000000-0000-0000-0000-000000000000"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No medication"));

    // Nothing was logged
    assert!(!data_dir.join("doses.jsonl").exists());
}

#[test]
fn test_bulk_serve_skips_missing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    let med_a = add_med(data_dir, &patient_id, "Amoxicillin", "qid");
    let med_b = add_med(data_dir, &patient_id, "Metformin", "bd");

    cli()
        .args([
            "bulk-serve",
            &med_a,
            "00000000-0000-0000-0000-000000000000",
            &med_b,
        ])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Served 2 of 3"));
}

#[test]
fn test_remove_patient_cascades() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    add_med(data_dir, &patient_id, "Amoxicillin", "qid");

    cli()
        .args(["patient", "remove", &patient_id])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 medication(s)"));

    cli()
        .args(["med", "list"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No medications"));
}

#[test]
fn test_export_includes_empty_patient_row() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let patient_id = add_patient(data_dir, "Ada Osei");
    add_med(data_dir, &patient_id, "Amoxicillin", "qid");
    add_patient(data_dir, "Beatriz Lima");

    let out = data_dir.join("roster.csv");
    cli()
        .arg("export")
        .arg("--out")
        .arg(&out)
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    let contents = fs::read_to_string(&out).unwrap();
    assert!(contents.starts_with("Patient Name,Room Number,Medication Name"));
    assert!(contents.contains("Amoxicillin"));
    // A patient with no medications still appears
    assert!(contents.contains("Beatriz Lima"));
}

#[test]
fn test_watch_once_runs_cleanly() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    add_patient(data_dir, "Ada Osei");

    cli()
        .args(["watch", "--once"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}
