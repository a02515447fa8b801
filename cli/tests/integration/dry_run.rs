//! Integration tests for `--dry-run`: plan and rendered files, no host changes.

#![allow(clippy::expect_used)]

use predicates::prelude::*;

use crate::cli_tests::provision;

#[test]
fn test_dry_run_prints_plan_and_vhost() {
    provision()
        .args(["--dry-run", "--domain", "n8n.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Provisioning plan for n8n.example.com"))
        .stdout(predicate::str::contains("sync-packages"))
        .stdout(predicate::str::contains("hardening"))
        .stdout(predicate::str::contains("proxy_pass http://localhost:5678;"))
        .stdout(predicate::str::contains("/etc/systemd/system/n8n.service"))
        .stdout(predicate::str::contains("Dry run: nothing was changed"));
}

#[test]
fn test_dry_run_never_shows_a_password() {
    provision()
        .args(["--dry-run", "--domain", "n8n.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_POSTGRESDB_PASSWORD=\"********\""));
}

#[test]
fn test_dry_run_uses_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "service_port: 6789\ndomain: demo.example.com\ntarget_user: automation\n",
    )
    .expect("write settings");

    provision()
        .arg("--dry-run")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("server_name demo.example.com;"))
        .stdout(predicate::str::contains("proxy_pass http://localhost:6789;"))
        .stdout(predicate::str::contains("/home/automation/.n8n/.env"))
        .stdout(predicate::str::contains("User=automation"));
}

#[test]
fn test_domain_flag_overrides_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "domain: demo.example.com\n").expect("write settings");

    provision()
        .args(["--dry-run", "--domain", "n8n.example.com"])
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("server_name n8n.example.com;"));
}

#[test]
fn test_dry_run_json_is_a_single_document() {
    let output = provision()
        .args(["--dry-run", "--json", "--domain", "n8n.example.com"])
        .output()
        .expect("run binary");
    assert!(output.status.success());

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["domain"], "n8n.example.com");
    assert_eq!(v["url"], "https://n8n.example.com/");
    assert_eq!(v["steps"].as_array().expect("steps").len(), 12);
    assert_eq!(v["steps"][5]["step"], "database-bootstrap");
    assert_eq!(v["files"].as_array().expect("files").len(), 3);
}

#[test]
fn test_quiet_dry_run_prints_nothing() {
    provision()
        .args(["--dry-run", "--quiet", "--domain", "n8n.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
