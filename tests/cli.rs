use assert_cmd::Command;
use predicates::prelude::*;

fn kdp_invoice() -> Command {
    Command::cargo_bin("kdp-invoice").unwrap()
}

#[test]
fn config_path_prints_explicit_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    kdp_invoice()
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"));
}

#[test]
fn config_init_then_check_reports_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    kdp_invoice()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration créée"));
    assert!(path.exists());

    kdp_invoice()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    kdp_invoice()
        .arg("--config")
        .arg(&path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("entreprise.nom"));
}

#[test]
fn config_set_rejects_invalid_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    kdp_invoice()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "entreprise.bic", "AGRIFRPP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entreprise.bic = AGRIFRPP"));

    kdp_invoice()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "entreprise.siret", "12A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SIRET"));
}

#[test]
fn generate_with_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    kdp_invoice()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["generate", "kdp.xlsx", "--year", "2024", "--month", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non trouvé"))
        .stderr(predicate::str::contains("la génération a échoué"));
}

#[test]
fn generate_rejects_month_out_of_range() {
    kdp_invoice()
        .args(["generate", "kdp.xlsx", "--month", "13"])
        .assert()
        .failure();
}

#[test]
fn info_shows_version() {
    kdp_invoice()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: "))
        .stdout(predicate::str::contains("Paiements"));
}
