//! Integration tests for the intake CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VALID_INSTITUTION: &str = r#"
institutionName: Mercy General
institutionType: hospital
contractStartDate: "2025-01-01"
primaryContactName: Dana Whitfield
primaryContactPhone: "555-201-3344"
primaryContactEmail: dana@mercy.example
address: 100 Hospital Way
city: Springfield
state: IL
zipCode: "62701"
services: [bls, als]
serviceRates:
  bls:
    rate: 300
    confirmed: true
"#;

/// Helper to get an intake command isolated in `tmp`
fn intake(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("intake").unwrap();
    cmd.current_dir(tmp.path())
        .env("INTAKE_DATA_DIR", tmp.path().join("data"))
        .env("XDG_CONFIG_HOME", tmp.path().join("config"))
        .env("HOME", tmp.path())
        .env_remove("INTAKE_DRAFT_STORE")
        .env_remove("INTAKE_LOG");
    cmd
}

fn write_file(tmp: &TempDir, name: &str, content: &str) -> String {
    let path = tmp.path().join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn outbox_files(tmp: &TempDir) -> Vec<std::path::PathBuf> {
    let dir = tmp.path().join("data").join("outbox");
    match fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Step-by-step data entry"))
        .stdout(predicate::str::contains("submit"));
}

#[test]
fn test_short_help_displays() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Medical transport intake wizards"));
}

#[test]
fn test_unknown_wizard_rejected() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["steps", "vehicle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("intake"));
}

// ============================================================================
// Steps Tests
// ============================================================================

#[test]
fn test_steps_table() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["steps", "employee", "--rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("medical-license"))
        .stdout(predicate::str::contains("depends on primaryRole"))
        .stdout(predicate::str::contains("Cross-field rules"));
}

#[test]
fn test_steps_json() {
    let tmp = TempDir::new().unwrap();
    let output = intake(&tmp)
        .args(["steps", "trip", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["id"], "trip-intake");
    let ids: Vec<&str> = value["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.first(), Some(&"method"));
    assert_eq!(ids.last(), Some(&"review"));
}

// ============================================================================
// Check Tests
// ============================================================================

#[test]
fn test_check_valid_file() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "mercy.yaml", VALID_INSTITUTION);
    intake(&tmp)
        .args(["check", "institution", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_check_reports_errors_by_step() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(
        &tmp,
        "bad.yaml",
        "institutionName: M\ninstitutionType: hospital\nzipCode: \"627\"\n",
    );
    intake(&tmp)
        .args(["check", "institution", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("basic/institutionName"))
        .stderr(predicate::str::contains("location/zipCode"));
}

#[test]
fn test_check_single_step() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(
        &tmp,
        "basic.yaml",
        "institutionName: Mercy General\ninstitutionType: hospital\ncontractStartDate: \"2025-01-01\"\n",
    );
    intake(&tmp)
        .args(["check", "institution", &file, "--step", "basic"])
        .assert()
        .success();
    intake(&tmp)
        .args(["check", "institution", &file, "--step", "contacts"])
        .assert()
        .failure();
}

#[test]
fn test_check_inactive_step_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "driver.yaml", "primaryRole: driver\n");
    intake(&tmp)
        .args(["check", "employee", &file, "--step", "medical-license"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not part of this"));
}

#[test]
fn test_check_json_output() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "empty.json", "{}");
    let output = intake(&tmp)
        .args(["check", "institution", &file, "-f", "json"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["valid"], false);
    assert!(value["errors"]["institutionName"].is_string());
    assert_eq!(value["activeSteps"].as_array().unwrap().len(), 4);
}

#[test]
fn test_check_warns_on_unknown_keys() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "extra.yaml", &format!("{}fax: \"555\"\n", VALID_INSTITUTION));
    intake(&tmp)
        .args(["check", "institution", &file])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring unknown field 'fax'"));
}

// ============================================================================
// Submit Tests
// ============================================================================

#[test]
fn test_submit_writes_outbox() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "mercy.yaml", VALID_INSTITUTION);
    intake(&tmp)
        .args(["submit", "institution", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitted institution-intake"));

    let files = outbox_files(&tmp);
    assert_eq!(files.len(), 1);
    let payload: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(payload["wizard"], "institution-intake");
    assert_eq!(payload["data"]["basic"]["institutionName"], "Mercy General");
    assert_eq!(payload["data"]["services"]["paymentTerms"], "net-30");
}

#[test]
fn test_submit_incomplete_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "partial.yaml", "institutionName: Mercy General\n");
    intake(&tmp)
        .args(["submit", "institution", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("first in step 'basic'"));
    assert!(outbox_files(&tmp).is_empty());
}

#[test]
fn test_submit_clears_saved_draft() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "mercy.yaml", VALID_INSTITUTION);
    intake(&tmp)
        .args(["draft", "save", "institution", &file])
        .assert()
        .success();
    intake(&tmp)
        .args(["submit", "institution", &file])
        .assert()
        .success();
    intake(&tmp)
        .args(["draft", "show", "institution"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No draft saved"));
}

// ============================================================================
// Draft Tests
// ============================================================================

#[test]
fn test_draft_save_show_list() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "partial.yaml", "institutionName: Mercy General\ncity: Springfield\n");

    intake(&tmp)
        .args(["draft", "save", "institution", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("draft:institution-intake"));

    intake(&tmp)
        .args(["draft", "show", "institution"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mercy General"))
        .stdout(predicate::str::contains("Springfield"));

    intake(&tmp)
        .args(["draft", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("institution-intake"));
}

#[test]
fn test_draft_sqlite_store() {
    let tmp = TempDir::new().unwrap();
    let file = write_file(&tmp, "trip.yaml", "creationMethod: template\ntemplateName: Dialysis MWF\n");

    intake(&tmp)
        .env("INTAKE_DRAFT_STORE", "sqlite")
        .args(["draft", "save", "trip", &file])
        .assert()
        .success();
    assert!(tmp.path().join("data").join("drafts.db").exists());

    let output = intake(&tmp)
        .env("INTAKE_DRAFT_STORE", "sqlite")
        .args(["draft", "list", "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["wizard"], "trip-intake");
}

#[test]
fn test_draft_list_empty() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["draft", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No drafts saved"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_keys() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["config", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("draft_store"))
        .stdout(predicate::str::contains("INTAKE_DATA_DIR"));
}

#[test]
fn test_config_set_and_show() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["config", "set", "draft_store", "sqlite"])
        .assert()
        .success();
    assert!(tmp.path().join(".intake").join("config.yaml").exists());

    intake(&tmp)
        .args(["config", "show", "draft_store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sqlite"));

    intake(&tmp)
        .args(["config", "unset", "draft_store"])
        .assert()
        .success();
    intake(&tmp)
        .args(["config", "show", "draft_store"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file"));
}

#[test]
fn test_config_rejects_bad_values() {
    let tmp = TempDir::new().unwrap();
    intake(&tmp)
        .args(["config", "set", "draft_store", "redis"])
        .assert()
        .failure();
    intake(&tmp)
        .args(["config", "set", "author", "someone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}
