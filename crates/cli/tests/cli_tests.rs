//! CLI integration tests
//!
//! Each test runs the built `podmon` binary with `HOME` pointed at a scratch directory, so no
//! user config file or kubeconfig leaks in.

use chrono::{Duration, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const HEADER: &str = "Timestamp,Namespace,Pod,CPU,Memory,Status";

fn podmon(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_podmon"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("KUBECONFIG")
        .env_remove("KUBERNETES_SERVICE_HOST")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute podmon")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Record log with recent rows for `ns1/api` (two OK at 100m/256Mi, one error) and `ns2/db`
fn write_fixture(dir: &Path) -> PathBuf {
    let ts = |minutes_ago: i64| {
        (Utc::now() - Duration::minutes(minutes_ago)).to_rfc3339_opts(SecondsFormat::Secs, true)
    };
    let rows = [
        HEADER.to_string(),
        format!("{},ns1,api,100m,256Mi,OK", ts(30)),
        format!("{},ns2,db,400m,1024Mi,OK", ts(30)),
        format!("{},ns1,api,N/A,N/A,ERROR: timeout", ts(20)),
        format!("{},ns1,api,100m,256Mi,OK", ts(10)),
        format!("{},ns2,db,N/A,N/A,SKIP: status=Pending", ts(10)),
    ];
    let path = dir.join("output.csv");
    std::fs::write(&path, rows.join("\n") + "\n").unwrap();
    path
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = podmon(home.path(), &["--help"]);
    let text = stdout(&output);

    assert!(output.status.success(), "CLI help should succeed");
    for command in ["collect", "report", "cost", "optimize", "reset"] {
        assert!(text.contains(command), "Should show {command} command");
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = podmon(home.path(), &["--version"]);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout(&output).contains("podmon"), "Should show binary name");
}

#[test]
fn test_collect_help_lists_flags() {
    let home = TempDir::new().unwrap();
    let output = podmon(home.path(), &["collect", "--help"]);
    let text = stdout(&output);

    assert!(output.status.success());
    for flag in ["--interval", "--output", "--namespaces", "--labels", "--retry-delay-ms"] {
        assert!(text.contains(flag), "Should show {flag}");
    }
}

#[test]
fn test_reset_missing_file() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("absent.csv");
    let output = podmon(home.path(), &["reset", "-f", missing.to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("nothing to clear"));
    assert!(!missing.exists());
}

#[test]
fn test_reset_clears_existing_log() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(home.path(), &["reset", "--file", path.to_str().unwrap()]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_cost_json() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(
        home.path(),
        &["cost", "-f", path.to_str().unwrap(), "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report = json(&output);
    let workloads = report["workloads"].as_array().unwrap();
    assert_eq!(workloads.len(), 2);
    assert_eq!(workloads[0]["key"]["namespace"], "ns1");
    assert_eq!(workloads[0]["key"]["name"], "api");

    let api_cost = workloads[0]["cost"]["cpu"].as_f64().unwrap()
        + workloads[0]["cost"]["memory"].as_f64().unwrap();
    assert!((api_cost - 0.0045).abs() < 1e-9);

    // db: 400m -> 0.008, 1024Mi -> 0.01
    let total = report["total"]["cpu"].as_f64().unwrap() + report["total"]["memory"].as_f64().unwrap();
    assert!((total - 0.0225).abs() < 1e-9);
}

#[test]
fn test_cost_table_shows_monthly_totals() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(
        home.path(),
        &["cost", "-f", path.to_str().unwrap(), "--cpu-price", "0.02", "--mem-price", "0.01"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("ns1/api"));
    assert!(text.contains("$3.24"), "api monthly cost missing:\n{text}");
    assert!(text.contains("$16.20"), "cluster monthly cost missing:\n{text}");
}

#[test]
fn test_config_file_supplies_defaults() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let config_dir = home.path().join(".config").join("podmon");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        format!(
            r#"{{"file": {:?}, "format": "json"}}"#,
            path.to_str().unwrap()
        ),
    )
    .unwrap();

    let output = podmon(home.path(), &["cost"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json(&output)["workloads"].as_array().unwrap().len(), 2);
}

#[test]
fn test_optimize_without_cluster() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(
        home.path(),
        &["optimize", "-f", path.to_str().unwrap(), "-m", "20", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let plan = json(&output);
    let plan = plan.as_array().unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0]["key"]["name"], "api");
    assert_eq!(plan[0]["requests"]["cpu_milli"], 121);
    assert_eq!(plan[0]["limits"]["memory_mi"], 308);
    assert_eq!(plan[0]["current"]["state"], "unavailable");
}

#[test]
fn test_report_json() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(
        home.path(),
        &["report", "-f", path.to_str().unwrap(), "-l", "1h", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report = json(&output);
    assert_eq!(report["summary"]["workloads"], 2);
    assert_eq!(report["top_cpu"][0]["key"]["name"], "db");
    assert_eq!(report["anomalies"]["outcome"], "clear");
    assert_eq!(report["limits_annotated"], false);
}

#[test]
fn test_report_window_excludes_old_rows() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(
        home.path(),
        &["report", "-f", path.to_str().unwrap(), "-l", "5m", "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json(&output)["summary"]["workloads"], 0);
}

#[test]
fn test_invalid_window_fails() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let output = podmon(home.path(), &["report", "-f", path.to_str().unwrap(), "-l", "yesterday"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("yesterday"));
}

#[test]
fn test_window_beyond_calendar_range_fails() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());

    for command in ["report", "cost"] {
        let output = podmon(
            home.path(),
            &[command, "-f", path.to_str().unwrap(), "--last", "100000000w"],
        );
        assert!(!output.status.success());
        assert!(stderr(&output).contains("duration too large"));
        assert!(!stderr(&output).contains("panicked"));
    }
}

#[test]
fn test_missing_log_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("absent.csv");
    let output = podmon(home.path(), &["cost", "-f", missing.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("absent.csv"));
}

#[test]
fn test_malformed_rows_are_skipped() {
    let home = TempDir::new().unwrap();
    let path = write_fixture(home.path());
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("garbage\n");
    content.push_str("2024-01-01T00:00:00Z,ns1,api,lots,256Mi,OK\n");
    std::fs::write(&path, content).unwrap();

    let output = podmon(
        home.path(),
        &["cost", "-f", path.to_str().unwrap(), "--format", "json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Skipped 2 malformed rows"));
    assert_eq!(json(&output)["workloads"].as_array().unwrap().len(), 2);
}
