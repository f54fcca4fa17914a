use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("billing_cli").unwrap();
    cmd.env("BILLING_CORE_HOME", home);
    cmd
}

#[test]
fn slip_preview_prints_the_slip_without_touching_history() {
    let temp = tempdir().unwrap();

    cli(temp.path())
        .args(["slip", "101", "1", "5670", "22", "--date", "2025-08-10", "--preview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Final Pay:"))
        .stdout(predicate::str::contains("120,146.40"))
        .stdout(predicate::str::contains("V.No.: 101"));

    let history = fs::read_to_string(temp.path().join("history.csv")).unwrap();
    assert_eq!(history.lines().count(), 1, "only the header expected");
}

#[test]
fn slip_appends_and_report_finds_the_voucher() {
    let temp = tempdir().unwrap();

    cli(temp.path())
        .args(["slip", "7", "1", "5670", "22", "--date", "2025-08-10"])
        .assert()
        .success();

    cli(temp.path())
        .args(["report", "5", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Client 01 (7)"))
        .stdout(predicate::str::contains("1,20,146.40"));

    cli(temp.path())
        .args(["report", "50", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No vouchers found in this range"));
}

#[test]
fn unknown_client_fails_before_reaching_the_engine() {
    let temp = tempdir().unwrap();

    cli(temp.path())
        .args(["slip", "7", "99", "5670", "22"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("client number 99 not found"));
}

#[test]
fn saving_the_same_report_twice_reports_already_saved() {
    let temp = tempdir().unwrap();

    cli(temp.path())
        .args(["slip", "7", "1", "5670", "22", "--date", "2025-08-10"])
        .assert()
        .success();

    let args = [
        "report", "5", "9", "--party", "Durga Traders", "--date", "2025-08-10", "--save",
    ];
    cli(temp.path())
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved report to"));

    cli(temp.path())
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Already saved:"));
}
