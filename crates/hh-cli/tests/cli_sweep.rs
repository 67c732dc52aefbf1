use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hhstat"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn write_plan(dir: &Path, command: &str) -> PathBuf {
    let plan = dir.join("plan.yaml");
    std::fs::write(
        &plan,
        format!(
            r#"
label: Res_s2
output_root: out
command: {command}
groups:
  - name: lm
    points: [250, 260]
  - name: hm
    points: [450]
"#
        ),
    )
    .unwrap();
    plan
}

fn report(dir: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join("out/Res_s2/sweep_report.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn statuses(v: &serde_json::Value) -> Vec<String> {
    v["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["status"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn dry_run_prints_commands_and_touches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = write_plan(tmp.path(), r#"[run_limits, --output, "{output}", --signal-point, "{point}"]"#);

    let out = run_in(tmp.path(), &["sweep", "--plan", plan.to_str().unwrap(), "--dry-run"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        [
            "% run_limits --output out/Res_s2/lm_250 --signal-point 250",
            "% run_limits --output out/Res_s2/lm_260 --signal-point 260",
            "% run_limits --output out/Res_s2/hm_450 --signal-point 450",
        ]
    );
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn unknown_placeholder_fails_before_any_job() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = write_plan(tmp.path(), r#"[run_limits, "{mass}"]"#);

    let out = run_in(tmp.path(), &["sweep", "--plan", plan.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("mass"));
    assert!(!tmp.path().join("out").exists());
}

#[cfg(unix)]
#[test]
fn runs_every_point_in_a_fresh_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let stale = tmp.path().join("out/Res_s2/lm_250/stale.json");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "{}").unwrap();

    let plan = write_plan(tmp.path(), r#"[sh, -c, "echo {point} > {output}/done.txt"]"#);
    let out = run_in(tmp.path(), &["sweep", "--plan", plan.to_str().unwrap()]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    assert!(!stale.exists());
    for (dir, point) in [("lm_250", "250"), ("lm_260", "260"), ("hm_450", "450")] {
        let done = std::fs::read_to_string(tmp.path().join("out/Res_s2").join(dir).join("done.txt")).unwrap();
        assert_eq!(done.trim(), point);
    }
    let v = report(tmp.path());
    assert_eq!(statuses(&v), ["ok", "ok", "ok"]);
    assert_eq!(v["plan_hash"].as_str().unwrap().len(), 64);
}

#[cfg(unix)]
#[test]
fn failing_point_aborts_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = write_plan(tmp.path(), r#"[sh, -c, "test {point} != 260"]"#);

    let out = run_in(tmp.path(), &["sweep", "--plan", plan.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("260"));
    assert_eq!(statuses(&report(tmp.path())), ["ok", "failed", "not_run"]);
    assert!(!tmp.path().join("out/Res_s2/hm_450").exists());
}

#[cfg(unix)]
#[test]
fn keep_going_runs_remaining_points_and_reports_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let plan = write_plan(tmp.path(), r#"[sh, -c, "test {point} != 260"]"#);

    let out = run_in(tmp.path(), &["sweep", "--plan", plan.to_str().unwrap(), "--keep-going"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("1 of 3 sweep jobs failed"));

    let v = report(tmp.path());
    assert_eq!(statuses(&v), ["ok", "failed", "ok"]);
    assert_eq!(v["jobs"][1]["point"]["value"], "260");
}
