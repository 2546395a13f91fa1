use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn replay_into(session: &Path) -> Vec<Value> {
    let output = cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(fixture("measure_plan.json"))
        .arg("--save")
        .arg(session)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    String::from_utf8(output)
        .expect("stdout should be utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect()
}

#[test]
fn replay_prints_one_outcome_per_action() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let outcomes = replay_into(&temp.path().join("session.json"));

    assert_eq!(outcomes.len(), 32);
    assert_eq!(outcomes[0]["outcome"], "render_requested");
    assert_eq!(outcomes[0]["ticket"]["generation"], 1);
    assert_eq!(outcomes[1]["outcome"], "page_ready");
    assert_eq!(outcomes[5]["outcome"], "calibrated");
    assert_eq!(outcomes[5]["pixels_per_unit"], 20.0);

    let labels: Vec<&str> = outcomes
        .iter()
        .filter(|o| o["outcome"] == "measurement_added")
        .map(|o| o["label"].as_str().expect("label should be a string"))
        .collect();
    assert_eq!(
        labels,
        ["Line 10.00m", "Rectangle 10.00m²", "Polygon 12.50m²", "Count", "Count"]
    );

    let linked = outcomes.last().expect("script is not empty");
    assert_eq!(linked["outcome"], "linked");
    assert_eq!(linked["subtotal"], 125.0);
}

#[test]
fn totals_emits_stable_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let session = temp.path().join("session.json");
    replay_into(&session);

    let output = cargo_bin_cmd!("takeoff-cli")
        .arg("totals")
        .arg(&session)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");

    insta::assert_json_snapshot!("cli_totals_measure_plan", value);
}

#[test]
fn export_writes_measurement_and_cost_csv() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let session = temp.path().join("session.json");
    replay_into(&session);

    let measurements = temp.path().join("out/measurements.csv");
    let cost_items = temp.path().join("out/cost_items.csv");

    cargo_bin_cmd!("takeoff-cli")
        .arg("export")
        .arg(&session)
        .arg("--output")
        .arg(&measurements)
        .arg("--cost-items")
        .arg(&cost_items)
        .assert()
        .success()
        .stdout(predicate::str::contains("measurements.csv"));

    let csv = std::fs::read_to_string(&measurements).expect("measurement csv should exist");
    assert!(csv.starts_with("ID,Page,Type,Label"));
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.contains("Kitchen"));

    let costs = std::fs::read_to_string(&cost_items).expect("cost csv should exist");
    assert!(costs.contains("Skirting,10.00,1,12.50,125.00,5.00"));
}

#[test]
fn replay_writes_store_ops_since_resume() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let session = temp.path().join("session.json");
    let ops_path = temp.path().join("ops.jsonl");

    cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(fixture("measure_plan.json"))
        .arg("--save")
        .arg(&session)
        .arg("--store-ops")
        .arg(&ops_path)
        .assert()
        .success();

    let ops: Vec<Value> = std::fs::read_to_string(&ops_path)
        .expect("store ops should exist")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each op should be json"))
        .collect();
    assert_eq!(ops.len(), 5);
    assert!(ops.iter().all(|op| op["op"] == "upsert"));
    assert_eq!(ops[1]["measurement"]["area"], "Kitchen");

    let script = temp.path().join("delete.json");
    std::fs::write(&script, r#"[{ "action": "delete_measurement", "measurement": 0 }]"#)
        .expect("script should be written");

    cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(&script)
        .arg("--resume")
        .arg(&session)
        .arg("--store-ops")
        .arg(&ops_path)
        .assert()
        .success();

    let ops = std::fs::read_to_string(&ops_path).expect("store ops should exist");
    let ops: Vec<Value> = ops
        .lines()
        .map(|line| serde_json::from_str(line).expect("each op should be json"))
        .collect();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0]["op"], "delete");
    assert_eq!(ops[0]["id"], first_measurement_id(&session));
}

fn first_measurement_id(session: &Path) -> Value {
    let raw = std::fs::read_to_string(session).expect("session should exist");
    let value: Value = serde_json::from_str(&raw).expect("session should be json");
    value["measurements"][0]["id"].clone()
}

#[test]
fn replay_stops_on_failed_action() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let script = temp.path().join("bad.json");
    std::fs::write(
        &script,
        r#"[{ "action": "load_plan", "page_count": 1 },
            { "action": "begin_calibration", "real_distance": 0.0 }]"#,
    )
    .expect("script should be written");

    cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("action 1 failed"));

    cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(&script)
        .arg("--keep-going")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""outcome":"error""#));
}

#[test]
fn replay_fails_for_missing_script() {
    cargo_bin_cmd!("takeoff-cli")
        .arg("replay")
        .arg(fixture("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn totals_fails_for_unsupported_session_version() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let session = temp.path().join("future.json");
    std::fs::write(&session, r#"{ "version": 99, "page_count": 1 }"#)
        .expect("session should be written");

    cargo_bin_cmd!("takeoff-cli")
        .arg("totals")
        .arg(&session)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported session format version 99"));
}
