use assert_cmd::Command;
use predicates::prelude::*;

fn meetpoint() -> Command {
    let mut cmd = Command::cargo_bin("meetpoint").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("MEETPOINT_ENV", "development")
        .env("MEETPOINT_API_URL", "http://127.0.0.1:9/v1");
    cmd
}

#[test]
fn test_help_lists_commands() {
    meetpoint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("centroid"))
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("track"));
}

#[test]
fn test_centroid_json() {
    let output = meetpoint()
        .args(["--format", "json", "centroid", "-74.0,40.71", "-73.9,40.75"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["points"], 2);
    let lng = json["centroid"][0].as_f64().unwrap();
    let lat = json["centroid"][1].as_f64().unwrap();
    assert!((lng - -73.95).abs() < 0.01);
    assert!((lat - 40.73).abs() < 0.01);
}

#[test]
fn test_centroid_map_order_text() {
    meetpoint()
        .args(["centroid", "--map-order", "40.71,-74.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[-74.000000, 40.710000]"))
        .stdout(predicate::str::contains("[40.710000, -74.000000]"));
}

#[test]
fn test_centroid_on_sentinel_has_no_center() {
    let output = meetpoint()
        .args(["-f", "json", "centroid", "-1,0", "1,0"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["centroid"].is_null());
}

#[test]
fn test_centroid_across_antimeridian() {
    let output = meetpoint()
        .args(["-f", "json", "centroid", "179.9,0.5", "-179.9,0.5"])
        .output()
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let lng = json["centroid"][0].as_f64().unwrap();
    assert!((lng.abs() - 180.0).abs() < 1e-6, "{lng}");
}

#[test]
fn test_invalid_point_is_validation_error() {
    meetpoint()
        .args(["centroid", "200,40"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("E10002"));
}

#[test]
fn test_invalid_venue_is_rejected_before_sending() {
    meetpoint()
        .args([
            "select", "m1", "--name", "Nowhere", "--address", "-", "--lng", "200", "--lat", "40",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("longitude"));
}

#[test]
fn test_missing_config_file() {
    meetpoint()
        .args(["--config", "/definitely/not/here.toml", "centroid", "-74.0,40.71"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_config_file_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meetpoint.toml");
    std::fs::write(&path, "[suggestions]\ndebounce_ms = 150\n").unwrap();

    meetpoint()
        .args(["--config", path.to_str().unwrap(), "centroid", "-74.0,40.71"])
        .assert()
        .success();
}

#[test]
fn test_track_requires_readable_file() {
    meetpoint()
        .args(["track", "m1", "--attendee", "me", "--file", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_invalid_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meetpoint.toml");
    std::fs::write(&path, "[suggestions]\ndefault_radius_m = 0\n").unwrap();

    meetpoint()
        .args(["--config", path.to_str().unwrap(), "centroid", "-74.0,40.71"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("default_radius_m"));
}

#[test]
fn test_empty_track_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.json");
    std::fs::write(&path, "[]").unwrap();

    meetpoint()
        .args(["track", "m1", "--attendee", "me", "--file", path.to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("has no steps"));
}

#[test]
fn test_json_error_report() {
    let output = meetpoint()
        .args(["--format", "json", "centroid", "200,40"])
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["code_str"], "E10002");
    assert_eq!(report["category"], "Geo");
}
