//! End-to-end tests driving the `hw` binary.
//!
//! Tests the full pipeline: import → homework / heatmap / plan-context / status

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::{NamedTempFile, TempDir};

fn hw_binary() -> &'static str {
    env!("CARGO_BIN_EXE_hw")
}

/// Writes a config pointing at a fresh database inside `temp`.
fn write_config(temp: &Path) -> NamedTempFile {
    let db_path = temp.join("hw.db");
    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        r#"database_path = "{}"

[inference]
timezone = "Europe/Moscow"
"#,
        db_path.display()
    )
    .unwrap();
    config_file.flush().unwrap();
    config_file
}

fn run_hw(config: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(hw_binary())
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn hw");

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "hw {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// One client with a flat near Nevsky and an office at Moskovskaya,
/// seen over three March weekdays. Times are Moscow local.
fn geo_rows() -> String {
    let mut rows = Vec::new();
    for day in 10..=12 {
        for (hour, lat, lon) in [
            (22, 59.9343, 30.3351),
            (7, 59.9343, 30.3351),
            (11, 59.8517, 30.3215),
            (15, 59.8517, 30.3215),
        ] {
            rows.push(format!(
                r#"{{"ac_client_hash": 1001, "eventaction": "Login Success", "geolatitude": {lat}, "geolongitude": {lon}, "dt": "2025-03-{day:02} {hour:02}:00:00"}}"#
            ));
        }
    }
    rows.push(
        r#"{"ac_client_hash": 1001, "eventaction": "Login Success", "geolatitude": 0, "geolongitude": 0, "dt": "2025-03-12 23:00:00"}"#
            .to_string(),
    );
    rows.join("\n")
}

fn seeded_config(temp: &TempDir) -> NamedTempFile {
    let config = write_config(temp.path());
    let output = run_hw(config.path(), &["import", "--kind", "geo"], Some(&geo_rows()));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Imported 13 rows"), "unexpected stderr: {stderr}");
    config
}

#[test]
fn test_import_then_homework() {
    let temp = TempDir::new().unwrap();
    let config = seeded_config(&temp);

    let output = run_hw(
        config.path(),
        &["homework", "--client", "1001", "--period", "all"],
        None,
    );
    let json = stdout_json(&output);

    assert_eq!(json["client_id"], "1001");
    assert_eq!(json["home"]["type"], "home");
    assert_eq!(json["home"]["lat"], 59.9343);
    assert_eq!(json["home"]["size"], 6);
    assert_eq!(json["home"]["last_seen"], "2025-03-12");
    assert_eq!(json["work"]["lat"], 59.8517);
    assert_eq!(json["work"]["confidence"], 1.0);
    assert_eq!(json["features"]["counts"]["total"], 12);
    assert_eq!(json["features"]["hourly_activity"][22], 3);
}

#[test]
fn test_reimport_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let config = seeded_config(&temp);

    let output = run_hw(config.path(), &["import"], Some(&geo_rows()));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Imported 0 rows"), "unexpected stderr: {stderr}");
}

#[test]
fn test_heatmap_counts_admitted_points() {
    let temp = TempDir::new().unwrap();
    let config = seeded_config(&temp);

    let output = run_hw(
        config.path(),
        &["heatmap", "--client", "1001", "--period", "all", "--limit", "5"],
        None,
    );
    let json = stdout_json(&output);

    // Limits below the floor are clamped up, so nothing is cut off.
    assert_eq!(json["count"], 12);
    assert_eq!(json["truncated"], false);
    assert_eq!(json["heat_points"].as_array().unwrap().len(), 12);
}

#[test]
fn test_portfolio_heatmap_uses_debt_filters() {
    let temp = TempDir::new().unwrap();
    let config = seeded_config(&temp);

    let debts = r#"{"ac_client_hash": 1001, "debt_tot_os_rub_amt": 75000, "overdue_bucket_name": "31-60", "npl_nflag": 0}"#;
    run_hw(config.path(), &["import", "--kind", "debts"], Some(debts));

    let output = run_hw(
        config.path(),
        &["heatmap", "--period", "all", "--bucket", "31-60", "--npl", "0"],
        None,
    );
    assert_eq!(stdout_json(&output)["count"], 12);

    let output = run_hw(
        config.path(),
        &["heatmap", "--period", "all", "--debt-min", "100000"],
        None,
    );
    assert_eq!(stdout_json(&output)["count"], 0);
}

#[test]
fn test_plan_context_without_history_asks_for_clarification() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = run_hw(
        config.path(),
        &["plan-context", "--client", "404", "--period", "7d"],
        None,
    );
    let json = stdout_json(&output);

    assert_eq!(json["client_id"], "404");
    assert_eq!(json["need_clarification"], true);
    assert_eq!(json["constraints"]["meeting_hours_weekday"][0], "10:00-13:00");
}

#[test]
fn test_status_lists_actions() {
    let temp = TempDir::new().unwrap();
    let config = seeded_config(&temp);

    let output = run_hw(config.path(), &["status"], None);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.starts_with("Client analytics status\n"));
    assert!(stdout.contains("- Login Success: 13 events, 1 clients"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        r#"database_path = "{}"

[inference]
night_start_hour = 30
"#,
        temp.path().join("hw.db").display()
    )
    .unwrap();
    config_file.flush().unwrap();

    let output = Command::new(hw_binary())
        .arg("--config")
        .arg(config_file.path())
        .arg("status")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid inference configuration"));
}
