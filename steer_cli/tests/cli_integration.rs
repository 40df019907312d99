use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Two levels, two repetitions: 16 trials across the four blocks.
fn write_valid_config(dir: &Path) -> PathBuf {
    let toml = r#"
[session]
reps_per_level = 2
rest_s = 1.0
long_break_s = 2.0
seed = 7

[tunnel]
levels = [
    { radius = 250.0, width = 100.0 },
    { radius = 400.0, width = 50.0 },
]

[analysis]
workers = 2
"#;
    let path = dir.join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn steer(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("steer_cli").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[derive(Debug, serde::Deserialize)]
struct Score {
    #[serde(rename = "PercentInTunnel")]
    pct: f64,
    #[serde(rename = "TimeoutFlag")]
    timeout: u8,
    #[serde(rename = "MovementTime")]
    mt: f64,
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["run"], 2, "required", "stderr")]
#[case(&["run", "--participant", "P01"], 1, "--sim", "stderr")]
#[case(&["run", "--participant", "P01", "--realtime"], 2, "--sim", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());

    let assert = steer(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[session]\ntick_ms = 0", "Invalid configuration")]
#[case("[session]\nreps_per_level = \"two\"", "not valid TOML")]
fn bad_config_exits_with_code_4(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, body).unwrap();

    steer(&cfg)
        .arg("self-check")
        .assert()
        .code(4)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_exits_with_code_4() {
    let dir = tempdir().unwrap();
    steer(&dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn json_errors_name_the_reason() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[analysis]\nworkers = 0").unwrap();

    let out = steer(&cfg).arg("--json").arg("self-check").output().unwrap();
    assert_eq!(out.status.code(), Some(4));
    let line = String::from_utf8_lossy(&out.stderr)
        .lines()
        .rev()
        .find(|l| l.contains("\"reason\""))
        .map(str::to_owned)
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["reason"], "Config");
}

#[test]
fn simulated_session_then_batch_processing() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let data = dir.path().join("data");

    let out = steer(&cfg)
        .args(["--json", "run", "--participant", " p07 ", "--sim"])
        .arg("--out")
        .arg(&data)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "run failed:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["trials_planned"], 16);
    assert_eq!(v["completed"], 16);
    assert_eq!(v["dropped"], 0);

    let scores: Vec<Score> = csv::Reader::from_path(data.join("p07_SCORES.csv"))
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(scores.len(), 16);
    for s in &scores {
        assert_eq!(s.timeout, 0);
        assert_eq!(s.pct, 100.0);
        assert!(s.mt > 2.5 && s.mt < 3.5, "movement time {}", s.mt);
    }
    assert!(data.join("p07_RAW.csv").exists());

    let meta = dir.path().join("meta.csv");
    fs::write(&meta, "ID,Group,ProficiencyScore\nP07,Expert,31\n").unwrap();
    let results = dir.path().join("results");
    let out = steer(&cfg)
        .args(["--json", "process", "--input"])
        .arg(&data)
        .arg("--metadata")
        .arg(&meta)
        .arg("--out")
        .arg(&results)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "process failed:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["processed"], 1);
    assert_eq!(v["trials"], 16);
    assert!(results.join("clean").join("P07_CLEAN.csv").exists());

    let mut rdr =
        csv::Reader::from_path(results.join("features").join("dataset_features.csv")).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let group = headers.iter().position(|h| h == "Group").unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 16);
    assert!(rows.iter().all(|r| &r[group] == "Expert"));
}

#[rstest]
#[case("ID,Team,Score\nP07,A,1\n")]
#[case("ID;Group;ProficiencyScore\nP07;Expert;high\n")]
fn unreadable_metadata_leaves_groups_unknown(#[case] body: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(dir.path());
    let data = dir.path().join("data");
    steer(&cfg)
        .args(["run", "--participant", "P07", "--sim"])
        .arg("--out")
        .arg(&data)
        .assert()
        .success();

    let meta = dir.path().join("meta.csv");
    fs::write(&meta, body).unwrap();
    let results = dir.path().join("results");
    steer(&cfg)
        .args(["process", "--input"])
        .arg(&data)
        .arg("--metadata")
        .arg(&meta)
        .arg("--out")
        .arg(&results)
        .assert()
        .success()
        .stderr(predicate::str::contains("participant metadata not loaded"));

    let mut rdr =
        csv::Reader::from_path(results.join("features").join("dataset_features.csv")).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let group = headers.iter().position(|h| h == "Group").unwrap();
    let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(rows.len(), 16);
    assert!(rows.iter().all(|r| &r[group] == "Unknown"));
}
