//! CLI binary smoke tests using assert_cmd.
//!
//! These tests run the compiled `medinify` binary to check argument parsing,
//! the train/classify round trip and error reporting end-to-end.

use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("medinify").unwrap()
}

fn write_reviews(dir: &Path) -> PathBuf {
    let path = dir.join("reviews.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "comment,rating").unwrap();
    for i in 0..10 {
        writeln!(file, "\"great relief, works {}\",5", i).unwrap();
        writeln!(file, "\"awful rash, nausea {}\",1", i).unwrap();
    }
    writeln!(file, "\"it was fine\",3").unwrap();
    path
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("classify"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("medinify"));
}

#[test]
fn unknown_classifier_is_rejected() {
    cmd()
        .args(["validate", "-r", "reviews.csv", "-c", "svm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("svm"));
}

// ---------------------------------------------------------------------------
// Train / classify / validate
// ---------------------------------------------------------------------------

#[test]
fn train_then_classify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write_reviews(dir.path());

    cmd()
        .arg("train")
        .arg("-r")
        .arg(&reviews)
        .args(["-c", "nb", "-o"])
        .arg(dir.path())
        .assert()
        .success();
    assert!(dir.path().join("trained_nb_model.bin").is_file());

    cmd()
        .arg("classify")
        .arg("-r")
        .arg(&reviews)
        .args(["-c", "nb", "-m"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("pos\tgreat relief, works 0"))
        .stdout(predicate::str::contains("neg\tawful rash, nausea 0"));
}

#[test]
fn classify_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write_reviews(dir.path());

    cmd()
        .arg("classify")
        .arg("-r")
        .arg(&reviews)
        .args(["-c", "dt", "-m"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No trained DecisionTree model"));
}

#[test]
fn seeded_validation_prints_fold_scores() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write_reviews(dir.path());

    cmd()
        .arg("validate")
        .arg("-r")
        .arg(&reviews)
        .args(["-c", "nb", "-f", "5", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fold 5\t"))
        .stdout(predicate::str::contains("mean\t"));
}

#[test]
fn inverted_thresholds_fail() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write_reviews(dir.path());

    cmd()
        .arg("validate")
        .arg("-r")
        .arg(&reviews)
        .args(["--pos-threshold", "1", "--neg-threshold", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid classifier configuration"));
}

#[test]
fn config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = write_reviews(dir.path());
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        r#"{"model_type": "NaiveBayes", "cross_validation": {"folds": 4, "seed": 2}}"#,
    )
    .unwrap();

    cmd()
        .arg("validate")
        .arg("-r")
        .arg(&reviews)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("fold 4\t"))
        .stdout(predicate::str::contains("fold 5").not());
}
