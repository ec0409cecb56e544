//! Execution context shared by every step.
//!
//! Owns the parsed interpreter, the run log, the cancellation flag, and the
//! write-through state view. Steps go through `run_script` and `poll` so all
//! child processes share one spawning and logging discipline.

use crate::cancel::CancelFlag;
use crate::config::{WorkflowConfig, CLIENT_TOKEN_MODE_ENV};
use crate::poll::{self, PollOutcome};
use crate::runlog::RunLog;
use crate::runner::{self, CommandSpec, StepResult};
use crate::state::{StateStore, WorkflowState};
use anyhow::{ensure, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct WorkflowContext {
    pub config: WorkflowConfig,
    pub state: WorkflowState,
    pub log: RunLog,
    pub cancel: CancelFlag,
    /// Resolved interpreter program plus any flags from the config string.
    program: PathBuf,
    program_args: Vec<String>,
}

impl WorkflowContext {
    pub fn new(config: WorkflowConfig, log: RunLog, cancel: CancelFlag) -> Result<Self> {
        let mut words = shell_words::split(&config.interpreter)
            .with_context(|| format!("parse interpreter `{}`", config.interpreter))?;
        ensure!(!words.is_empty(), "interpreter must not be empty");
        let program = runner::resolve_program(&words.remove(0))?;
        let state = WorkflowState::load(StateStore::new(config.state_file.clone()));
        Ok(Self {
            config,
            state,
            log,
            cancel,
            program,
            program_args: words,
        })
    }

    /// Build the invocation for one step script. The script path is given
    /// relative to `scripts_dir`, which is also the child's working
    /// directory; extra env entries are listed explicitly on the command.
    pub fn script_spec(&self, script: &Path, args: &[&str]) -> CommandSpec {
        let mut argv = self.program_args.clone();
        argv.push(script.display().to_string());
        argv.extend(args.iter().map(|arg| arg.to_string()));
        let mut env = BTreeMap::new();
        env.insert(
            CLIENT_TOKEN_MODE_ENV.to_string(),
            self.config.client_token_mode.as_str().to_string(),
        );
        CommandSpec {
            program: self.program.clone(),
            args: argv,
            cwd: self.config.scripts_dir.clone(),
            env,
        }
    }

    pub fn run_script(&self, script: &Path, args: &[&str]) -> Result<StepResult> {
        runner::run_command(&self.script_spec(script, args), &self.log)
    }

    pub fn script_exists(&self, script: &Path) -> bool {
        self.config.scripts_dir.join(script).is_file()
    }

    /// Poll a changeset by repeatedly invoking the describe script with the
    /// changeset id as its only argument.
    pub fn poll(&self, changeset_id: &str, describe_script: &Path) -> PollOutcome {
        poll::poll_changeset(
            changeset_id,
            &self.config.poll_config(),
            &self.log,
            &self.cancel,
            || self.run_script(describe_script, &[changeset_id]),
        )
    }
}
