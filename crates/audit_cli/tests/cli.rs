//! End-to-end CLI tests driving the `audit` binary against a minimal
//! election directory written to a tempdir.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// A two-candidate, single-collection, single-measurement election with
/// audited votes already matching reported ones, small enough to pass in
/// one stage.
fn write_trivial_election(root: &Path, dirname: &str) {
    let e = root.join(dirname);

    write(
        &e,
        "1-election-spec/election-spec-contests.csv",
        "Contest,Contest type,Params,Write-ins,Selections\nC1,plurality,,No,Alice,Bob\n",
    );
    write(
        &e,
        "1-election-spec/election-spec-contest-groups.csv",
        "Contest group,Contest(s) or group(s)\nG1,C1\n",
    );
    write(
        &e,
        "1-election-spec/election-spec-collections.csv",
        "Collection,Manager,CVR type,Required Contests,Possible Contests\nP1,Jane,CVR,G1,G1\n",
    );

    let mut manifest = String::from(
        "Collection,Box,Position,Stamp,Ballot id,Number of ballots,Required Contests,Possible Contests,Comments\n",
    );
    let mut cvrs = String::from("Collection,Scanner,Ballot id,Contest,Selections\n");
    let mut audited = String::from("Collection,Ballot id,Contest,Selections\n");
    for i in 0..20u32 {
        let bid = format!("b{i}");
        let vote = if i < 12 { "Alice" } else { "Bob" };
        manifest.push_str(&format!("P1,B1,{i},S1,{bid},1,,,\n"));
        cvrs.push_str(&format!("P1,S1,{bid},C1,{vote}\n"));
        audited.push_str(&format!("P1,{bid},C1,{vote}\n"));
    }
    write(&e, "2-reported/21-reported-ballot-manifests/manifest-P1.csv", &manifest);
    write(&e, "2-reported/22-reported-cvrs/reported-cvrs-P1.csv", &cvrs);
    write(&e, "2-reported/23-reported-outcomes.csv", "Contest,Winner(s)\nC1,Alice\n");
    write(&e, "3-audit/33-audited-votes/audited-votes-P1.csv", &audited);

    write(
        &e,
        "3-audit/31-audit-spec/audit-spec-contest.csv",
        "Measurement id,Contest,Risk Measurement Method,Risk Limit,Risk Upset Threshold,Sampling Mode,Initial Status,Param 1,Param 2\n\
         M1,C1,Bayes,0.05,0.98,Active,Open,,\n",
    );
    write(&e, "3-audit/31-audit-spec/audit-spec-collection.csv", "Collection,Max audit rate\nP1,20\n");
    write(&e, "3-audit/31-audit-spec/audit-spec-seed.csv", "Audit seed\n123456789\n");
}

#[test]
fn read_election_spec_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_trivial_election(dir.path(), "e1");

    Command::cargo_bin("audit")
        .unwrap()
        .args(["e1", "--elections_root", dir.path().to_str().unwrap(), "--read_election_spec"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 contest").and(predicate::str::contains("1 collection")));
}

#[test]
fn missing_election_directory_is_reported_with_exit_code_2() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("audit")
        .unwrap()
        .args(["does-not-exist", "--elections_root", dir.path().to_str().unwrap(), "--read_election_spec"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("election directory not found"));
}

#[test]
fn no_mode_flag_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_trivial_election(dir.path(), "e1");

    Command::cargo_bin("audit")
        .unwrap()
        .args(["e1", "--elections_root", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no mode selected"));
}

#[test]
fn pause_runs_exactly_one_stage_and_prints_a_measurement_line() {
    let dir = tempfile::tempdir().unwrap();
    write_trivial_election(dir.path(), "e1");

    Command::cargo_bin("audit")
        .unwrap()
        .args(["e1", "--elections_root", dir.path().to_str().unwrap(), "--audit", "--pause"])
        .assert()
        .success()
        .stdout(predicate::str::contains("M1 C1"));
}

#[test]
fn set_audit_seed_rejects_a_non_decimal_value() {
    let dir = tempfile::tempdir().unwrap();
    write_trivial_election(dir.path(), "e1");

    Command::cargo_bin("audit")
        .unwrap()
        .args([
            "e1",
            "--elections_root",
            dir.path().to_str().unwrap(),
            "--set_audit_seed",
            "not-a-number",
            "--read_election_spec",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --set_audit_seed"));
}
