//! Sequential grid-sweep driver.

use std::path::{Path, PathBuf};

use hh_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::exec::{CommandRunner, RunStatus};
use crate::plan::{ParameterPoint, SweepPlan};
use crate::workdir;

/// What to do when a job exits unsuccessfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing job.
    #[default]
    Abort,
    /// Record the failure and go on with the next point.
    Continue,
}

/// Run-time options that are not part of the plan.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Overrides the plan's `output_root`.
    pub output_root: Option<PathBuf>,
    /// Working directory used when the plan does not name one.
    pub base_dir: PathBuf,
    pub dry_run: bool,
    pub policy: FailurePolicy,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            output_root: None,
            base_dir: PathBuf::from("."),
            dry_run: false,
            policy: FailurePolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Ok,
    Failed,
    /// Dry run: recorded, not executed.
    Planned,
    /// Not reached because an earlier job aborted the sweep.
    NotRun,
}

/// One job in `sweep_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepJobReport {
    pub point: ParameterPoint,
    pub output_dir: String,
    pub cwd: String,
    pub argv: Vec<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Persisted summary of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub label: String,
    pub plan_hash: String,
    pub output_dir: String,
    pub dry_run: bool,
    pub jobs: Vec<SweepJobReport>,
}

impl SweepReport {
    pub fn n_failed(&self) -> usize {
        self.jobs.iter().filter(|j| j.status == JobStatus::Failed).count()
    }

    pub fn n_ok(&self) -> usize {
        self.jobs.iter().filter(|j| j.status == JobStatus::Ok).count()
    }

    /// `<output_root>/<label>/sweep_report.json`.
    pub fn path(&self) -> PathBuf {
        Path::new(&self.output_dir).join("sweep_report.json")
    }

    /// Write the report; a relative `output_dir` resolves against `cwd`.
    fn save_under(&self, cwd: &Path) -> Result<()> {
        let dir = cwd.join(&self.output_dir);
        workdir::ensure_dir(&dir)?;
        let path = dir.join("sweep_report.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)? + "\n")?;
        tracing::info!(path = %path.display(), "wrote sweep report");
        Ok(())
    }
}

/// Run every point of `plan` in declaration order.
///
/// Each point directory is reset before its command runs. With
/// [`FailurePolicy::Abort`] the first failure is returned as
/// [`Error::CommandFailed`] after the report has been written; with
/// [`FailurePolicy::Continue`] failures are only recorded. A dry run prints
/// the commands and neither touches the filesystem nor calls `runner`.
pub fn run_sweep(
    plan: &SweepPlan,
    runner: &mut dyn CommandRunner,
    opts: &SweepOptions,
) -> Result<SweepReport> {
    let output_root = opts.output_root.clone().unwrap_or_else(|| plan.output_root.clone());
    let cwd = match &plan.workdir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => opts.base_dir.join(dir),
        None => opts.base_dir.clone(),
    };
    let jobs = plan.jobs(&output_root, &cwd)?;

    let mut report = SweepReport {
        label: plan.label.clone(),
        plan_hash: plan.hash()?,
        output_dir: output_root.join(&plan.label).display().to_string(),
        dry_run: opts.dry_run,
        jobs: jobs
            .iter()
            .map(|job| SweepJobReport {
                point: job.point.clone(),
                output_dir: job.output_dir.display().to_string(),
                cwd: job.invocation.cwd.display().to_string(),
                argv: std::iter::once(job.invocation.program.clone())
                    .chain(job.invocation.args.iter().cloned())
                    .collect(),
                status: if opts.dry_run { JobStatus::Planned } else { JobStatus::NotRun },
                detail: None,
            })
            .collect(),
    };
    tracing::info!(label = %plan.label, jobs = jobs.len(), dry_run = opts.dry_run, "starting sweep");

    if opts.dry_run {
        for job in &jobs {
            println!("% {}", job.invocation.display());
        }
        return Ok(report);
    }

    for (idx, job) in jobs.iter().enumerate() {
        // Relative output paths in the argv resolve against the job's working directory.
        workdir::reset_dir(&cwd.join(&job.output_dir))?;

        let outcome = match runner.run(&job.invocation) {
            Ok(RunStatus::Success) => None,
            Ok(RunStatus::Failed(status)) => Some(status),
            Err(Error::CommandFailed { status, .. }) => Some(status),
            Err(e) => return Err(e),
        };
        let entry = &mut report.jobs[idx];
        match outcome {
            None => entry.status = JobStatus::Ok,
            Some(status) => {
                entry.status = JobStatus::Failed;
                entry.detail = Some(status.clone());
                tracing::warn!(point = %job.point.dir_name(), %status, "sweep job failed");
                if opts.policy == FailurePolicy::Abort {
                    report.save_under(&cwd)?;
                    return Err(Error::CommandFailed { command: job.invocation.display(), status });
                }
            }
        }
    }

    report.save_under(&cwd)?;
    if report.n_failed() > 0 {
        tracing::warn!(failed = report.n_failed(), total = report.jobs.len(), "sweep finished with failures");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::RecordingRunner;

    fn plan(root: &Path) -> SweepPlan {
        SweepPlan::from_yaml_str(&format!(
            r#"
label: Res_s2
output_root: {}
command: [run_limits, --output, "{{output}}", --signal-point, "{{point}}"]
groups:
  - name: lm
    points: [250, 260]
  - name: hm
    points: [450]
"#,
            root.display()
        ))
        .unwrap()
    }

    #[test]
    fn runs_every_point_in_order_with_fresh_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let stale = tmp.path().join("Res_s2/lm_250/stale.json");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "{}").unwrap();

        let mut runner = RecordingRunner::new();
        let opts = SweepOptions { base_dir: tmp.path().to_path_buf(), ..Default::default() };
        let report = run_sweep(&plan(tmp.path()), &mut runner, &opts).unwrap();

        let points: Vec<&str> =
            runner.invocations.iter().map(|inv| inv.args[3].as_str()).collect();
        assert_eq!(points, ["250", "260", "450"]);
        assert!(!stale.exists());
        for dir in ["lm_250", "lm_260", "hm_450"] {
            assert!(tmp.path().join("Res_s2").join(dir).is_dir());
        }
        assert_eq!(report.n_ok(), 3);
        assert!(tmp.path().join("Res_s2/sweep_report.json").is_file());
    }

    #[test]
    fn abort_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = RecordingRunner::new().fail_matching("--signal-point 260");
        let opts = SweepOptions { base_dir: tmp.path().to_path_buf(), ..Default::default() };
        let err = run_sweep(&plan(tmp.path()), &mut runner, &opts).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }), "{err}");
        assert_eq!(runner.invocations.len(), 2);

        let text = std::fs::read_to_string(tmp.path().join("Res_s2/sweep_report.json")).unwrap();
        let report: SweepReport = serde_json::from_str(&text).unwrap();
        let statuses: Vec<JobStatus> = report.jobs.iter().map(|j| j.status).collect();
        assert_eq!(statuses, [JobStatus::Ok, JobStatus::Failed, JobStatus::NotRun]);
    }

    #[test]
    fn continue_reports_every_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = RecordingRunner::new().fail_matching("--signal-point 2");
        let opts = SweepOptions {
            base_dir: tmp.path().to_path_buf(),
            policy: FailurePolicy::Continue,
            ..Default::default()
        };
        let report = run_sweep(&plan(tmp.path()), &mut runner, &opts).unwrap();
        assert_eq!(runner.invocations.len(), 3);
        assert_eq!(report.n_failed(), 2);
        assert_eq!(report.jobs[0].detail.as_deref(), Some("exit code 1"));
        assert_eq!(report.jobs[2].status, JobStatus::Ok);
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut runner = RecordingRunner::new();
        let opts = SweepOptions {
            base_dir: tmp.path().to_path_buf(),
            dry_run: true,
            ..Default::default()
        };
        let report = run_sweep(&plan(tmp.path()), &mut runner, &opts).unwrap();
        assert!(runner.invocations.is_empty());
        assert!(!tmp.path().join("Res_s2").exists());
        assert!(report.jobs.iter().all(|j| j.status == JobStatus::Planned));
        assert_eq!(report.jobs[2].argv.last().map(String::as_str), Some("450"));
    }
}
