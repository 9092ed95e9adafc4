//! Integration tests for the growthcalc binary.
//!
//! These tests verify end-to-end behavior including:
//! - Single-visit computation in text and JSON form
//! - Batch computation over a visits CSV
//! - Failure on missing reference tables and malformed arguments

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TABLES: [(&str, &str); 6] = [
    (
        "weianthro.csv",
        "sex,age,l,m,s\n2,734,-0.2024,10.9,0.10\n1,366,0.1,9.6,0.11\n",
    ),
    (
        "lenanthro.csv",
        "sex,age,l,m,s,loh\n2,734,1,85.7,0.0359,H\n1,366,1,75.7,0.033,L\n",
    ),
    ("wflanthro.csv", "sex,length,l,m,s,lorh\n1,75,1,9.5,0.08,L\n"),
    ("wfhanthro.csv", "sex,height,l,m,s,lorh\n2,73.3,1,10,0.1,H\n"),
    ("bmianthro.csv", "sex,age,l,m,s\n2,734,1,15.5,0.08\n1,366,1,17.2,0.08\n"),
    ("hcanthro.csv", "sex,age,l,m,s\n2,734,1,46.0,0.03\n"),
];

/// Helper to create a directory holding small reference tables
fn setup_reference_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, contents) in TABLES {
        fs::write(temp_dir.path().join(name), contents).expect("Failed to write table");
    }
    temp_dir
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("growthcalc"))
}

fn calc(data_dir: &TempDir) -> Command {
    let mut cmd = cli();
    cmd.arg("calc")
        .arg("--data-dir")
        .arg(data_dir.path())
        .args(["--sex", "female"])
        .args(["--birth-date", "2005-03-21"])
        .args(["--visit-date", "2007-03-25"])
        .args(["--weight", "8.2"])
        .args(["--length", "74.0"])
        .args(["--measured", "recumbent"]);
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--format").arg("json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout should be JSON")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WHO child growth indicator calculator",
        ));
}

#[test]
fn test_calc_text_output() {
    let data_dir = setup_reference_dir();

    calc(&data_dir)
        .args(["--head-circumference", "45.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Age: 734 days"))
        .stdout(predicate::str::contains("weight_for_age"))
        .stdout(predicate::str::contains("head_circumference_for_age"))
        .stdout(predicate::str::contains("NaN"));
}

#[test]
fn test_calc_json_output() {
    let data_dir = setup_reference_dir();
    let json = json_output(calc(&data_dir).args(["--head-circumference", "45.0"]));

    assert_eq!(json["age_in_days"], 734);
    let bmi = json["body_mass_index"].as_f64().unwrap();
    assert!((bmi - 15.26).abs() < 0.01);

    let wflh = json["weight_for_length_or_height_zscore"].as_f64().unwrap();
    assert!((wflh - -1.8).abs() < 0.01);

    let lhfa = json["length_or_height_for_age_zscore"].as_f64().unwrap();
    assert!((lhfa - -4.03).abs() < 0.01);
    assert!(json["length_or_height_for_age_percentile"].is_null());

    let hc = json["head_circumference_for_age_percentile"].as_f64().unwrap();
    assert!((hc - 23.4).abs() < 0.1);
}

#[test]
fn test_calc_without_head_circumference() {
    let data_dir = setup_reference_dir();
    let json = json_output(&mut calc(&data_dir));
    let object = json.as_object().unwrap();

    assert!(!object.contains_key("head_circumference_for_age_zscore"));
    assert!(!object.contains_key("head_circumference_for_age_percentile"));
    assert!(json["weight_for_age_zscore"].is_number());
}

#[test]
fn test_calc_with_oedema() {
    let data_dir = setup_reference_dir();
    let json = json_output(calc(&data_dir).arg("--oedema"));

    assert!(json["body_mass_index"].is_null());
    assert!(json["weight_for_age_zscore"].is_null());
    assert!(json["weight_for_length_or_height_zscore"].is_null());
    assert!(json["body_mass_index_for_age_zscore"].is_null());
    assert!(json["length_or_height_for_age_zscore"].is_number());
}

#[test]
fn test_calc_visit_before_birth() {
    let data_dir = setup_reference_dir();
    let json = json_output(
        cli()
            .arg("calc")
            .arg("--data-dir")
            .arg(data_dir.path())
            .args(["--sex", "male"])
            .args(["--birth-date", "2011-02-10"])
            .args(["--visit-date", "2011-02-08"])
            .args(["--weight", "30.0"])
            .args(["--length", "40.0"])
            .args(["--head-circumference", "35.0"])
            .args(["--measured", "standing"]),
    );

    assert_eq!(json["age_in_days"], -2);
    for indicator in [
        "weight_for_length_or_height",
        "weight_for_age",
        "length_or_height_for_age",
        "body_mass_index_for_age",
        "head_circumference_for_age",
    ] {
        assert!(json[format!("{}_zscore", indicator)].is_null());
        assert!(json[format!("{}_percentile", indicator)].is_null());
    }
}

#[test]
fn test_calc_without_dates_reports_no_age() {
    let data_dir = setup_reference_dir();
    let json = json_output(
        cli()
            .arg("calc")
            .arg("--data-dir")
            .arg(data_dir.path())
            .args(["--sex", "male"])
            .args(["--weight", "10.0"])
            .args(["--length", "75.0"])
            .args(["--measured", "recumbent"]),
    );

    assert_eq!(json["age_in_days"], -1);
    assert!(json["weight_for_age_zscore"].is_null());
}

#[test]
fn test_missing_reference_tables_fail() {
    let data_dir = tempfile::tempdir().unwrap();

    calc(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("weianthro.csv"));
}

#[test]
fn test_malformed_arguments_fail_fast() {
    let data_dir = setup_reference_dir();

    cli()
        .arg("calc")
        .arg("--data-dir")
        .arg(data_dir.path())
        .args(["--sex", "unknown"])
        .args(["--weight", "8.2"])
        .args(["--length", "74.0"])
        .args(["--measured", "recumbent"])
        .assert()
        .failure();

    calc(&data_dir)
        .args(["--weight", "heavy"])
        .assert()
        .failure();
}

#[test]
fn test_batch_creates_csv() {
    let data_dir = setup_reference_dir();
    let input = data_dir.path().join("visits.csv");
    let output = data_dir.path().join("stats.csv");

    fs::write(
        &input,
        "sex,birth_date,visit_date,weight,length,head_circumference,measured,has_oedema
FEMALE,2005-03-21,2007-03-25,8.2,74.0,45.0,RECUMBENT,false
MALE,2004-01-01,2005-01-01,10.0,75.0,,STANDING,false
MALE,2004-01-01,2005-01-01,ten,75.0,,STANDING,false
",
    )
    .unwrap();

    cli()
        .arg("batch")
        .arg("--data-dir")
        .arg(data_dir.path())
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Computed statistics for 2 visits"))
        .stdout(predicate::str::contains("Skipped 1 malformed rows"));

    let csv_content = fs::read_to_string(&output).expect("Failed to read CSV");
    assert!(csv_content.starts_with("generated_date,age_in_days,body_mass_index"));
    assert_eq!(csv_content.lines().count(), 3);
    assert!(csv_content.contains(",366,"));
}

/// Rows for a girl of 734 days whose parameters reproduce the published
/// results for 8.2 kg, 74.0 cm lying down and 45.0 cm head circumference.
/// Male and neighbouring rows make sure the right row is chosen.
const TWO_YEAR_OLD_GIRL_TABLES: [(&str, &str); 6] = [
    (
        "weianthro.csv",
        "sex,age,l,m,s\n1,734,0.0012,12.1541,0.1108\n2,733,-0.2024,11.4840,0.1216\n2,734,-0.2024,11.4886,0.1216\n2,735,-0.2024,11.4932,0.1216\n",
    ),
    (
        "lenanthro.csv",
        "sex,age,l,m,s,loh\n1,734,1,87.1,0.0345,H\n2,734,1,85.3571,0.0365,H\n2,735,1,85.38,0.0365,H\n",
    ),
    (
        "wflanthro.csv",
        "sex,length,l,m,s,lorh\n2,73.3,-0.3833,9.3,0.0825,L\n2,74,-0.3833,9.4,0.0825,L\n",
    ),
    (
        "wfhanthro.csv",
        "sex,height,l,m,s,lorh\n1,73.3,-0.3521,9.1,0.0823,H\n2,73.3,-0.3833,8.8938,0.0825,H\n2,74,-0.3833,9.05,0.0825,H\n",
    ),
    (
        "bmianthro.csv",
        "sex,age,l,m,s\n1,734,-0.6187,16.0,0.0812\n2,734,-0.6,15.6884,0.085\n",
    ),
    (
        "hcanthro.csv",
        "sex,age,l,m,s\n1,734,1,48.3,0.0287\n2,734,1,47.1537,0.029\n",
    ),
];

fn assert_near(expected: f64, actual: &serde_json::Value, eps: f64) {
    let actual = actual.as_f64().expect("value should be a number");
    assert!(
        (expected - actual).abs() <= eps,
        "expected {} got {}",
        expected,
        actual
    );
}

#[test]
fn test_calc_two_year_old_girl_measured_lying_down() {
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, contents) in TWO_YEAR_OLD_GIRL_TABLES {
        fs::write(data_dir.path().join(name), contents).expect("Failed to write table");
    }

    let json = json_output(calc(&data_dir).args(["--head-circumference", "45.0"]));

    assert_eq!(json["age_in_days"], 734);
    assert_near(15.3, &json["body_mass_index"], 0.1);
    // 74.0 cm lying down is looked up as 73.3 cm standing
    assert_near(-1.00, &json["weight_for_length_or_height_zscore"], 0.01);
    assert_near(15.9, &json["weight_for_length_or_height_percentile"], 0.1);
    assert_near(-2.87, &json["weight_for_age_zscore"], 0.01);
    assert_near(0.2, &json["weight_for_age_percentile"], 0.1);
    assert_near(-3.87, &json["length_or_height_for_age_zscore"], 0.01);
    assert!(json["length_or_height_for_age_percentile"].is_null());
    assert_near(-0.33, &json["body_mass_index_for_age_zscore"], 0.01);
    assert_near(37.2, &json["body_mass_index_for_age_percentile"], 0.1);
    assert_near(-1.58, &json["head_circumference_for_age_zscore"], 0.01);
    assert_near(5.8, &json["head_circumference_for_age_percentile"], 0.1);
}

#[test]
fn test_calc_rejects_non_finite_measurements() {
    let data_dir = setup_reference_dir();

    cli()
        .arg("calc")
        .arg("--data-dir")
        .arg(data_dir.path())
        .args(["--sex", "female"])
        .args(["--weight", "NaN"])
        .args(["--length", "74.0"])
        .args(["--measured", "recumbent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("finite"));

    calc(&data_dir)
        .args(["--head-circumference", "inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("finite"));
}
