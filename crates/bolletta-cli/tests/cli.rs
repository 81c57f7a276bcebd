use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ELECTRICITY_BILL: &str = "IREN MERCATO S.p.A. Bolletta luce
Periodo di riferimento 01/11/2024 - 31/12/2024
Consumo nel periodo 86 kWh
Consumo annuo kWh 443
Spesa annua sostenuta iva compresa 471,12 €
Quota fissa 2 mesi x 19,55 € = 39,10 €
TOTALE DA PAGARE 78,52 €
";

const GAS_BILL: &str = "Bolletta gas - fatturazione trimestrale. Fornitore: Eni Plenitude. \
consumo gas totale 310 smc nel periodo. totale da pagare 142,30 € entro la scadenza.";

const NO_AMOUNT_BILL: &str = "Enel Energia S.p.A. bolletta luce, consumo nel periodo 250 kWh, \
lettura contatore del 15/03/2024, codice cliente 123456789, cordiali saluti.";

fn bolletta(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bolletta").unwrap();
    // Never pick up a real user configuration
    cmd.arg("--config").arg(dir.join("config.json"));
    cmd
}

fn write_config(dir: &Path) {
    bolletta(dir).args(["config", "init"]).assert().success();
}

#[test]
fn parse_electricity_bill() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bill = dir.path().join("iren.txt");
    fs::write(&bill, ELECTRICITY_BILL).unwrap();

    bolletta(dir.path())
        .arg("parse")
        .arg(&bill)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#))
        .stdout(predicate::str::contains(r#""operator":"IREN Mercato""#))
        .stdout(predicate::str::contains(r#""annualSpend":471.12"#))
        .stdout(predicate::str::contains(r#""taxes":null"#));
}

#[test]
fn verbose_flag_after_subcommand() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bill = dir.path().join("iren.txt");
    fs::write(&bill, ELECTRICITY_BILL).unwrap();

    bolletta(dir.path())
        .arg("parse")
        .arg(&bill)
        .arg("-vv")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#));
}

#[test]
fn parse_gas_bill_from_stdin() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    bolletta(dir.path())
        .args(["parse", "-", "--energy", "gas", "--format", "text"])
        .write_stdin(GAS_BILL)
        .assert()
        .success()
        .stdout(predicate::str::contains("Eni Plenitude"))
        .stdout(predicate::str::contains("1240 Smc"))
        .stdout(predicate::str::contains("569,20 €"));
}

#[test]
fn parse_missing_total_fails_with_preview() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bill = dir.path().join("enel.txt");
    fs::write(&bill, NO_AMOUNT_BILL).unwrap();

    bolletta(dir.path())
        .arg("parse")
        .arg(&bill)
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""success":false"#))
        .stdout(predicate::str::contains(r#""rawTextPreview":"Enel Energia"#))
        .stdout(predicate::str::contains(r#""total":null"#));
}

#[test]
fn parse_short_text_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bill = dir.path().join("short.txt");
    fs::write(&bill, "TOTALE DA PAGARE 78,52 €").unwrap();

    bolletta(dir.path())
        .arg("parse")
        .arg(&bill)
        .assert()
        .failure()
        .stdout(predicate::str::contains("input too short"))
        .stdout(predicate::str::contains("rawTextPreview").not());
}

#[test]
fn parse_with_model_requires_api_key() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bill = dir.path().join("iren.txt");
    fs::write(&bill, ELECTRICITY_BILL).unwrap();

    bolletta(dir.path())
        .env_remove("OPENAI_API_KEY")
        .args(["parse", "--engine", "model"])
        .arg(&bill)
        .assert()
        .failure()
        .stdout(predicate::str::contains("not configured"));
}

#[test]
fn batch_writes_reports_and_summary() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    let bills = dir.path().join("bills");
    let out = dir.path().join("out");
    fs::create_dir_all(&bills).unwrap();
    fs::write(bills.join("iren.txt"), ELECTRICITY_BILL).unwrap();
    fs::write(bills.join("enel.txt"), NO_AMOUNT_BILL).unwrap();

    let pattern = bills.join("*.txt");
    bolletta(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("--output-dir")
        .arg(&out)
        .args(["--summary", "--continue-on-error"])
        .assert()
        .success();

    let report = fs::read_to_string(out.join("iren.json")).unwrap();
    // Decimals are written as JSON floats
    assert!(report.contains(r#""consumption":86.0"#));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,operator"));
    assert!(summary.contains("iren.txt,success,IREN Mercato,electricity,2,86,78.52,443,471.12"));
    assert!(summary.contains("enel.txt,error"));
}

#[test]
fn batch_stops_on_first_failure() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());
    fs::write(dir.path().join("enel.txt"), NO_AMOUNT_BILL).unwrap();

    let pattern = dir.path().join("*.txt");
    bolletta(dir.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn config_set_and_get() {
    let dir = TempDir::new().unwrap();

    bolletta(dir.path())
        .args(["config", "set", "extraction.default_energy", "gas"])
        .assert()
        .success();

    bolletta(dir.path())
        .args(["config", "get", "extraction.default_energy"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""gas""#));

    bolletta(dir.path())
        .args(["config", "set", "extraction.unknown_key", "1"])
        .assert()
        .failure();
}
