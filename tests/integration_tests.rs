//! Integration tests for the DFM CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get a dfm command isolated from the user's config and cache
fn dfm(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dfm").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env("DFM_CACHE_DIR", tmp.path().join("cache"))
        .env_remove("DFM_API_KEY")
        .env_remove("DFM_RULES")
        .env_remove("DFM_WORKERS")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp).arg("init").assert().success();
    tmp
}

fn box_request(name: &str, length: f64, width: f64, height: f64) -> Value {
    json!({
        "cad_data": {
            "part_name": name,
            "dimensions": {"length": length, "width": width, "height": height}
        },
        "material": "abs",
        "process": "injection_molding",
        "production_volume": 1000
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn plane(center: [f64; 3], normal: [f64; 3], min: [f64; 3], max: [f64; 3], area: f64) -> Value {
    json!({
        "surface": {"type": "plane"},
        "area": area,
        "center": center,
        "normal": normal,
        "bounds": {"min": min, "max": max}
    })
}

/// 60 x 40 x 10 plate with a 4 mm through hole, as a shape document
fn plate_document() -> Value {
    let (l, w, h) = (60.0, 40.0, 10.0);
    let r = 2.0;
    let faces = vec![
        plane([0.0, w / 2.0, h / 2.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, w, h], w * h),
        plane([l, w / 2.0, h / 2.0], [1.0, 0.0, 0.0], [l, 0.0, 0.0], [l, w, h], w * h),
        plane([l / 2.0, 0.0, h / 2.0], [0.0, -1.0, 0.0], [0.0, 0.0, 0.0], [l, 0.0, h], l * h),
        plane([l / 2.0, w, h / 2.0], [0.0, 1.0, 0.0], [0.0, w, 0.0], [l, w, h], l * h),
        plane([l / 2.0, w / 2.0, 0.0], [0.0, 0.0, -1.0], [0.0, 0.0, 0.0], [l, w, 0.0], l * w),
        plane([l / 2.0, w / 2.0, h], [0.0, 0.0, 1.0], [0.0, 0.0, h], [l, w, h], l * w),
        json!({
            "surface": {
                "type": "cylinder",
                "radius": r,
                "axis": [0.0, 0.0, 1.0],
                "location": [l / 2.0, w / 2.0, 0.0]
            },
            "area": 2.0 * std::f64::consts::PI * r * h,
            "center": [l / 2.0 + r, w / 2.0, h / 2.0],
            "normal": [-1.0, 0.0, 0.0],
            "bounds": {
                "min": [l / 2.0 - r, w / 2.0 - r, 0.0],
                "max": [l / 2.0 + r, w / 2.0 + r, h]
            }
        }),
    ];
    json!({
        "name": "PlateDoc",
        "active_object": "Body",
        "objects": [{
            "name": "Body",
            "label": "Mounting Plate",
            "shape": {
                "volume": l * w * h - std::f64::consts::PI * r * r * h,
                "area": 2.0 * (l * w + l * h + w * h),
                "center_of_mass": [l / 2.0, w / 2.0, h / 2.0],
                "vertex_count": 8,
                "faces": faces
            }
        }]
    })
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dfm"));
}

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized DFM project"));

    assert!(tmp.path().join(".dfm").is_dir());
    assert!(tmp.path().join(".dfm/config.yaml").is_file());
}

#[test]
fn test_init_twice_reports_existing_project() {
    let tmp = setup_test_project();
    dfm(&tmp)
        .arg("init")
        .assert()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dfm"));
}

// ============================================================================
// Analyze
// ============================================================================

#[test]
fn test_analyze_file_json_output() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "-f", "json", "--no-cache"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let response = stdout_json(&output);
    assert_eq!(response["part_name"], "Box");
    assert_eq!(response["manufacturability_score"], 85.0);
    assert_eq!(response["overall_rating"], "good");
    let titles: Vec<&str> = response["manufacturing_issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Wall Thickness Too Thick"));
    assert_eq!(response["process_recommendations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_analyze_reads_stdin() {
    let tmp = TempDir::new().unwrap();
    let body = box_request("Piped", 100.0, 50.0, 25.0).to_string();

    dfm(&tmp)
        .args(["analyze", "-f", "json", "--no-cache"])
        .write_stdin(body)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"part_name\": \"Piped\""));
}

#[test]
fn test_analyze_flag_overrides_process() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args([
            "analyze",
            path.to_str().unwrap(),
            "-p",
            "cnc_milling",
            "-m",
            "aluminum",
            "-f",
            "json",
            "--no-cache",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let response = stdout_json(&output);
    assert_eq!(response["primary_process"]["process"], "cnc_milling");
}

#[test]
fn test_analyze_invalid_json_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();

    dfm(&tmp)
        .args(["analyze", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad.json"));
}

#[test]
fn test_analyze_zero_volume_degrades() {
    let tmp = TempDir::new().unwrap();
    let mut request = box_request("Nothing", 100.0, 50.0, 25.0);
    request["production_volume"] = json!(0);
    let path = write_json(tmp.path(), "zero.json", &request);

    let output = dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let response = stdout_json(&output);
    assert_eq!(response["degraded"], true);
    assert_eq!(response["manufacturability_score"], 70.0);
    assert!(response["error"].is_string());
}

#[test]
fn test_analyze_second_run_is_cached() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let first = dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    let second = dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();

    let first = stdout_json(&first);
    let second = stdout_json(&second);
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(first["analysis_id"], second["analysis_id"]);
}

#[test]
fn test_analyze_save_writes_report() {
    let tmp = setup_test_project();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "--save", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let id = stdout_json(&output)["analysis_id"].as_str().unwrap().to_string();
    assert!(tmp.path().join(format!(".dfm/reports/{}.json", id)).is_file());
}

#[test]
fn test_analyze_from_shape_document() {
    let tmp = TempDir::new().unwrap();
    let doc = write_json(tmp.path(), "plate.shape.json", &plate_document());

    dfm(&tmp)
        .args([
            "analyze",
            "--shape",
            doc.to_str().unwrap(),
            "-f",
            "json",
            "--no-cache",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mounting Plate"));
}

// ============================================================================
// API Key
// ============================================================================

#[test]
fn test_api_key_required_when_configured() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    dfm(&tmp)
        .env("DFM_API_KEY", "s3cret")
        .args(["analyze", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));

    dfm(&tmp)
        .env("DFM_API_KEY", "s3cret")
        .args(["analyze", path.to_str().unwrap(), "--api-key", "wrong"])
        .assert()
        .failure();

    dfm(&tmp)
        .env("DFM_API_KEY", "s3cret")
        .args([
            "analyze",
            path.to_str().unwrap(),
            "--api-key",
            "s3cret",
            "-f",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("manufacturability_score"));
}

#[test]
fn test_api_key_from_project_config() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join(".dfm/config.yaml"), "api_key: from-config\n").unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    dfm(&tmp)
        .args(["batch", path.to_str().unwrap()])
        .assert()
        .failure();

    dfm(&tmp)
        .args(["batch", path.to_str().unwrap(), "--api-key", "from-config"])
        .assert()
        .success();
}

// ============================================================================
// Batch
// ============================================================================

#[test]
fn test_batch_directory_keeps_order_and_skips_bad_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("parts");
    fs::create_dir(&dir).unwrap();
    write_json(&dir, "a.json", &box_request("Alpha", 100.0, 50.0, 25.0));
    write_json(&dir, "b.json", &box_request("Bravo", 500.0, 10.0, 10.0));
    fs::write(dir.join("c.json"), "garbage").unwrap();
    write_json(&dir, "d.json", &box_request("Delta", 30.0, 30.0, 30.0));

    let output = dfm(&tmp)
        .args(["batch", dir.to_str().unwrap(), "-j", "2", "-f", "json", "--no-cache"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    let names: Vec<&str> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["response"]["part_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Delta"]);
    assert_eq!(report["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(report["workers"], 2);
    assert_eq!(report["metrics"]["total_requests"], 3);
}

#[test]
fn test_batch_tsv_table() {
    let tmp = TempDir::new().unwrap();
    let a = write_json(tmp.path(), "a.json", &box_request("Alpha", 100.0, 50.0, 25.0));

    dfm(&tmp)
        .args(["batch", a.to_str().unwrap(), "-f", "tsv", "--no-cache"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("File\tPart\tScore"))
        .stdout(predicate::str::contains("Alpha"));
}

#[test]
fn test_batch_without_requests_fails() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("empty");
    fs::create_dir(&dir).unwrap();

    dfm(&tmp)
        .args(["batch", dir.to_str().unwrap()])
        .assert()
        .failure();
}

// ============================================================================
// Features, Cost, Processes
// ============================================================================

#[test]
fn test_features_on_shape_document() {
    let tmp = TempDir::new().unwrap();
    let doc = write_json(tmp.path(), "plate.json", &plate_document());

    let output = dfm(&tmp)
        .args(["features", doc.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let inspection = stdout_json(&output);
    assert_eq!(inspection["part_name"], "Mounting Plate");
    assert_eq!(inspection["summary"]["face_count"], 7);
    assert_eq!(inspection["features"]["holes"].as_array().unwrap().len(), 1);
}

#[test]
fn test_features_missing_document_fails() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .args(["features", "nope.json"])
        .assert()
        .failure();
}

#[test]
fn test_cost_breakdown() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args(["cost", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let cost = stdout_json(&output);
    assert_eq!(cost["process"], "injection_molding");
    assert_eq!(cost["production_volume"], 1000);
    assert!(cost["total_cost_per_part"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_cost_compare_lists_candidates() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    dfm(&tmp)
        .args(["cost", path.to_str().unwrap(), "--compare", "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Process,Material,Labor"))
        .stdout(predicate::str::contains("CNC Milling"));
}

#[test]
fn test_processes_ranked_descending() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args(["processes", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let ranked = stdout_json(&output);
    let scores: Vec<f64> = ranked
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["suitability_score"].as_f64().unwrap())
        .collect();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

// ============================================================================
// Cache, Rules, Config
// ============================================================================

#[test]
fn test_cache_status_and_clear() {
    let tmp = TempDir::new().unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));
    dfm(&tmp)
        .args(["analyze", path.to_str().unwrap(), "-q"])
        .assert()
        .success();

    let output = dfm(&tmp)
        .args(["cache", "status", "-f", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["entries"], 1);

    dfm(&tmp)
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1"));
}

#[test]
fn test_rules_show_and_check() {
    let tmp = TempDir::new().unwrap();
    dfm(&tmp)
        .args(["rules", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("severity_weights"));

    dfm(&tmp)
        .args(["rules", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));
}

#[test]
fn test_rules_file_override() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join(".dfm/rules.yaml"),
        "candidate_processes: [cnc_milling]\n",
    )
    .unwrap();
    let path = write_json(tmp.path(), "box.json", &box_request("Box", 100.0, 50.0, 25.0));

    let output = dfm(&tmp)
        .args(["processes", path.to_str().unwrap(), "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 1);
}

#[test]
fn test_config_set_show_unset() {
    let tmp = setup_test_project();

    dfm(&tmp)
        .args(["config", "set", "workers", "8"])
        .assert()
        .success();
    dfm(&tmp)
        .args(["config", "show", "workers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8"));

    dfm(&tmp)
        .args(["config", "set", "workers", "many"])
        .assert()
        .failure();
    dfm(&tmp)
        .args(["config", "set", "author", "someone"])
        .assert()
        .failure();

    dfm(&tmp)
        .args(["config", "unset", "workers"])
        .assert()
        .success();
}

#[test]
fn test_config_show_masks_api_key() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join(".dfm/config.yaml"), "api_key: hunter2\n").unwrap();

    dfm(&tmp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}
