use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const PANEL: &str = r#"
name = "overhead"

[board]
pin_count = 16

[angle_maps]
trim = [[-10.0, 180.0], [10.0, 0.0]]

[[int_leds]]
pin = 3
identifier = "gear"
low_limit = 1
high_limit = 3

[[servos]]
pin = 9
identifier = "trim"
rest_angle = 5

[[steps]]
op = "led"
device = "gear"
value = 2

[[steps]]
op = "led"
device = "gear"
value = 7

[[steps]]
op = "power"
on = false

[[steps]]
op = "servo"
device = "trim"
angle = 0.0

[[steps]]
op = "power"
on = true

[[steps]]
op = "settle"
device = "trim"
"#;

fn write_scenario(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("scenario.toml");
    std::fs::write(&path, text).unwrap();
    path
}

fn bench() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sim-bench"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn replays_scenario_steps_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path(), PANEL);

    let output = bench().arg("--scenario").arg(&scenario).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 7);

    let statuses: Vec<_> = lines[..6]
        .iter()
        .map(|l| l["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        statuses,
        ["ok", "out_of_range", "ok", "powered_off", "ok", "ok"]
    );
    assert_eq!(lines[0]["output"], 2.0);
    assert_eq!(lines[3]["powered"], false);
    assert_eq!(lines[5]["output"], 45.0);
    assert_eq!(lines[5]["servo_value"], 45);

    let summary = &lines[6];
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["scenario"], "overhead");
    // out_of_range and powered_off are both rejections.
    assert_eq!(summary["accepted"], 4);
    assert_eq!(summary["rejected"], 2);
}

#[test]
fn reads_extra_steps_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path(), PANEL);

    let mut child = bench()
        .args(["--no-steps", "--stdin", "--no-summary", "--scenario"])
        .arg(&scenario)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, r#"{{"op":"servo","device":"trim","angle":10.0}}"#).unwrap();
        writeln!(stdin, "garbage").unwrap();
        writeln!(stdin, r#"{{"op":"self_test","device":"gear"}}"#).unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["output"], 0.0);
    assert_eq!(lines[1]["status"], "passed");
    assert_eq!(lines[1]["sequence"], 2);
}

#[test]
fn writes_audit_trail_and_metrics_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path(), PANEL);
    let audit = dir.path().join("logs").join("audit.jsonl");
    let metrics = dir.path().join("metrics.prom");

    let output = bench()
        .arg("--scenario")
        .arg(&scenario)
        .arg("--audit-log")
        .arg(&audit)
        .arg("--metrics-out")
        .arg(&metrics)
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: Vec<serde_json::Value> = std::fs::read_to_string(&audit)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.first().unwrap()["event_type"], "run_start");
    assert_eq!(entries.last().unwrap()["event_type"], "run_end");
    let rejected: Vec<_> = entries
        .iter()
        .filter(|e| e["event_type"] == "step_rejected")
        .map(|e| e["details"]["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(rejected, ["out_of_range", "powered_off"]);

    let text = std::fs::read_to_string(&metrics).unwrap();
    assert!(text.contains("sim_operations_total"));
    assert!(text.contains(r#"status="out_of_range""#));
    assert!(text.contains("sim_power_on 1"));
}

#[test]
fn invalid_scenario_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(
        dir.path(),
        r#"
[[int_leds]]
pin = 3
identifier = "gear"
low_limit = 10
high_limit = 1
"#,
    );

    let output = bench().arg("--scenario").arg(&scenario).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_scenario_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    let output = bench()
        .arg("--scenario")
        .arg(dir.path().join("absent.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn closed_stdout_aborts_run_and_audits_it() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = write_scenario(dir.path(), PANEL);
    let audit = dir.path().join("audit.jsonl");

    let mut child = bench()
        .args(["--no-steps", "--stdin", "--scenario"])
        .arg(&scenario)
        .arg("--audit-log")
        .arg(&audit)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Nothing is printed before the first stdin step, so the reader is gone
    // by the time the outcome line is written.
    drop(child.stdout.take());
    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"op":"led","device":"gear","value":2}}"#).unwrap();
    }
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(1));

    let entries: Vec<serde_json::Value> = std::fs::read_to_string(&audit)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.first().unwrap()["event_type"], "run_start");
    let last = entries.last().unwrap();
    assert_eq!(last["event_type"], "run_aborted");
    assert_eq!(last["details"]["summary"]["outcomes"], 1);
    assert!(last["details"]["error"].is_string());
}
