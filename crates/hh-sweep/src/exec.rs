//! External command execution.
//!
//! Every external tool is described by an [`Invocation`]: an argument vector
//! plus an explicit working directory. The driver never changes its own
//! working directory and never goes through a shell.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use hh_core::{Error, Result};

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Redirect standard output into this file (relative paths resolve against `cwd`).
    pub stdout: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), cwd: cwd.into(), stdout: None }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Shell-like rendering used for the `% <cmd>` audit line and error messages.
    pub fn display(&self) -> String {
        let mut out = quote(&self.program);
        for arg in &self.args {
            out.push(' ');
            out.push_str(&quote(arg));
        }
        if let Some(path) = &self.stdout {
            out.push_str(" > ");
            out.push_str(&quote(&path.display().to_string()));
        }
        out
    }

    fn stdout_path(&self) -> Option<PathBuf> {
        self.stdout.as_ref().map(|p| if p.is_absolute() { p.clone() } else { self.cwd.join(p) })
    }
}

fn quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%^{}[]|*".contains(c));
    if plain { s.to_string() } else { format!("'{}'", s.replace('\'', r"'\''")) }
}

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Non-zero exit, with a description such as `exit code 1` or `signal 9`.
    Failed(String),
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

/// Executes invocations.
///
/// `Err` is reserved for commands that could not be started at all.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<RunStatus>;

    /// Run and turn a non-zero exit into [`Error::CommandFailed`].
    fn run_checked(&mut self, invocation: &Invocation) -> Result<()> {
        match self.run(invocation)? {
            RunStatus::Success => Ok(()),
            RunStatus::Failed(status) => {
                Err(Error::CommandFailed { command: invocation.display(), status })
            }
        }
    }
}

/// Spawns real processes and waits for them.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Print `% <cmd>` to stdout before each command.
    pub echo: bool,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self { echo: true }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<RunStatus> {
        let rendered = invocation.display();
        if self.echo {
            println!("% {rendered}");
        }
        tracing::info!(cwd = %invocation.cwd.display(), command = %rendered, "running");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(&invocation.cwd);
        if let Some(path) = invocation.stdout_path() {
            cmd.stdout(Stdio::from(File::create(&path)?));
        }
        let status = cmd.status().map_err(|e| Error::CommandFailed {
            command: rendered.clone(),
            status: format!("failed to start: {e}"),
        })?;

        if status.success() {
            Ok(RunStatus::Success)
        } else {
            let described = describe(status);
            tracing::warn!(command = %rendered, status = %described, "command failed");
            Ok(RunStatus::Failed(described))
        }
    }
}

fn describe(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    "abnormal termination".to_string()
}

/// Records invocations instead of running them (dry runs and tests).
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    pub invocations: Vec<Invocation>,
    fail_patterns: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `exit code 1` for every invocation whose rendering contains `pattern`.
    pub fn fail_matching(mut self, pattern: impl Into<String>) -> Self {
        self.fail_patterns.push(pattern.into());
        self
    }

    /// Rendered command lines, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations.iter().map(Invocation::display).collect()
    }

    /// Working directories, relative to `root` where possible.
    pub fn cwds_relative_to(&self, root: &Path) -> Vec<PathBuf> {
        self.invocations
            .iter()
            .map(|inv| inv.cwd.strip_prefix(root).map(Path::to_path_buf).unwrap_or(inv.cwd.clone()))
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<RunStatus> {
        let rendered = invocation.display();
        tracing::debug!(cwd = %invocation.cwd.display(), command = %rendered, "recorded");
        self.invocations.push(invocation.clone());
        if self.fail_patterns.iter().any(|p| rendered.contains(p.as_str())) {
            Ok(RunStatus::Failed("exit code 1".into()))
        } else {
            Ok(RunStatus::Success)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let inv = Invocation::new("plotLimits.py", "/tmp")
            .args(["limits.json", "--y-title", "95% CL limit on #sigma x BR (pb)"])
            .arg("--show")
            .arg("exp,obs");
        assert_eq!(
            inv.display(),
            "plotLimits.py limits.json --y-title '95% CL limit on #sigma x BR (pb)' --show exp,obs"
        );
    }

    #[test]
    fn display_shows_redirect() {
        let inv = Invocation::new("python", "/w").arg("diff.py").stdout_to("../pulls.txt");
        assert_eq!(inv.display(), "python diff.py > ../pulls.txt");
        assert_eq!(inv.stdout_path().unwrap(), PathBuf::from("/w/../pulls.txt"));
    }

    #[test]
    fn recording_runner_fails_on_pattern() {
        let mut runner = RecordingRunner::new().fail_matching("--signal-point 260");
        let ok = Invocation::new("run", "/").args(["--signal-point", "250"]);
        let bad = Invocation::new("run", "/").args(["--signal-point", "260"]);
        assert!(runner.run(&ok).unwrap().success());
        assert_eq!(runner.run(&bad).unwrap(), RunStatus::Failed("exit code 1".into()));
        assert!(matches!(runner.run_checked(&bad), Err(Error::CommandFailed { .. })));
        assert_eq!(runner.invocations.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_uses_explicit_cwd_and_redirect() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner { echo: false };
        let inv = Invocation::new("pwd", dir.path()).stdout_to("where.txt");
        assert!(runner.run(&inv).unwrap().success());
        let written = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(written.trim()).canonicalize().unwrap(), expected);

        let status = runner.run(&Invocation::new("false", dir.path())).unwrap();
        assert_eq!(status, RunStatus::Failed("exit code 1".into()));
    }

    #[test]
    fn missing_program_is_an_error() {
        let mut runner = ProcessRunner { echo: false };
        let inv = Invocation::new("hh-definitely-not-a-real-tool", std::env::temp_dir());
        assert!(matches!(runner.run(&inv), Err(Error::CommandFailed { .. })));
    }
}
