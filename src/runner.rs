//! Child-process execution with captured output.
//!
//! Steps never read interactive input, so stdin is closed before spawn.
//! A non-zero exit is an observation for the caller to judge, not an error;
//! `Err` here means the process could not be spawned at all.

use crate::runlog::{Level, RunLog};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One fully-specified child invocation.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Additive over the inherited environment; listed explicitly so the
    /// child's contract is visible at the call site.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Shell-quoted command line for logging.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.display().to_string());
        parts.extend(self.args.iter().cloned());
        shell_words::join(&parts)
    }
}

/// Outcome of one step invocation.
#[derive(Clone, Debug)]
pub struct StepResult {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Resolve a program name against PATH; explicit paths pass through.
pub fn resolve_program(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.components().count() > 1 || path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    which::which(name).with_context(|| format!("locate `{name}` on PATH"))
}

/// Spawn the command, capture both streams, and record everything in the
/// run log: command line at INFO, stdout at INFO, stderr at WARN.
pub fn run_command(spec: &CommandSpec, log: &RunLog) -> Result<StepResult> {
    log.log(Level::Info, &format!("Running: {}", spec.command_line()));
    tracing::debug!(program = %spec.program.display(), "spawning step process");

    let output = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawn {}", spec.program.display()))?;

    let result = StepResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    match result.exit_code {
        Some(code) => log.log(Level::Info, &format!("Exit code: {code}")),
        None => log.log(Level::Warn, "Process terminated by signal"),
    }
    if !result.stdout.trim().is_empty() {
        log.log(Level::Info, &format!("STDOUT:\n{}", result.stdout));
    }
    if !result.stderr.trim().is_empty() {
        log.log(Level::Warn, &format!("STDERR:\n{}", result.stderr));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(program: &str, args: &[&str], cwd: &Path) -> CommandSpec {
        CommandSpec {
            program: PathBuf::from(program),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            cwd: cwd.to_path_buf(),
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create log");
        let spec = spec("sh", &["-c", "echo ChangeSet ID: cs-1"], dir.path());
        let result = run_command(&spec, &log).expect("run");
        assert!(result.success());
        assert!(result.stdout.contains("ChangeSet ID: cs-1"));
    }

    #[test]
    fn nonzero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create log");
        let spec = spec("sh", &["-c", "echo boom >&2; exit 3"], dir.path());
        let result = run_command(&spec, &log).expect("run");
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
        assert!(result.stderr.contains("boom"));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create log");
        let spec = spec("./no-such-program", &[], dir.path());
        assert!(run_command(&spec, &log).is_err());
    }

    #[test]
    fn stdin_is_closed_so_readers_do_not_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create log");
        // `cat` with an open stdin would hang; with a closed stdin it exits.
        let spec = spec("sh", &["-c", "cat; echo done"], dir.path());
        let result = run_command(&spec, &log).expect("run");
        assert!(result.success());
        assert!(result.stdout.contains("done"));
    }

    #[test]
    fn resolve_program_keeps_explicit_paths() {
        let resolved = resolve_program("./scripts/step.sh").expect("resolve");
        assert_eq!(resolved, PathBuf::from("./scripts/step.sh"));
    }

    #[test]
    fn resolve_program_finds_sh_on_path() {
        let resolved = resolve_program("sh").expect("resolve sh");
        assert!(resolved.is_absolute());
    }
}
