//! CLI argument parsing for the workflow driver.
//!
//! The CLI stays thin: commands resolve configuration and hand off to the
//! sequencer, poller, or state store without embedding policy of their own.
use crate::config::DEFAULT_CONFIG_FILE;
use crate::state::PRODUCT_CHANGESET_ID;
use crate::workflow::Step;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the opportunity-to-offer workflow.
#[derive(Parser, Debug)]
#[command(
    name = "oppflow",
    version,
    about = "Sequential workflow driver for the AWS Marketplace opportunity-to-offer demo",
    after_help = "Commands:\n  init                      Write a default workflow.json\n  run                       Run the six-step workflow end to end\n  poll [CHANGESET_ID]       Poll one changeset to a terminal status\n  state                     Inspect or edit the shared state file\n\nExamples:\n  oppflow init --config workflow.json\n  oppflow run --config workflow.json\n  oppflow run --from create-offer\n  oppflow poll 2irc20n325n8znc4fi4q0o3bb\n  oppflow state --set PRODUCT_ID=prod-45becev5xgcru",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Run(RunArgs),
    Poll(PollArgs),
    State(StateArgs),
}

/// Init command inputs for bootstrapping a config file.
#[derive(Parser, Debug)]
#[command(about = "Write a default workflow.json for operators to edit")]
pub struct InitArgs {
    /// Config file path
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Run command inputs; flags override the config file.
#[derive(Parser, Debug)]
#[command(about = "Run the opportunity-to-offer workflow end to end")]
pub struct RunArgs {
    /// Config file path (defaults apply when the file is absent)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory containing the step scripts
    #[arg(long, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// Shared state file read and rewritten by every step
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Directory receiving the per-run log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Seconds between changeset polls
    #[arg(long, value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Maximum poll attempts before reporting a timeout
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Resume from a named step, relying on the persisted shared state
    #[arg(long, value_enum, value_name = "STEP")]
    pub from: Option<Step>,
}

/// Poll command inputs for one changeset.
#[derive(Parser, Debug)]
#[command(about = "Poll a changeset until SUCCEEDED, FAILED, or timeout")]
pub struct PollArgs {
    /// Changeset id; falls back to the shared state, then a sample default
    pub changeset_id: Option<String>,

    /// Config file path (defaults apply when the file is absent)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// State key consulted when no changeset id is given
    #[arg(long, value_name = "KEY", default_value = PRODUCT_CHANGESET_ID)]
    pub state_key: String,

    /// Describe script to invoke, relative to the scripts directory
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Seconds between changeset polls
    #[arg(long, value_name = "SECS")]
    pub interval_secs: Option<u64>,

    /// Maximum poll attempts before reporting a timeout
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
}

/// State command inputs for inspecting or editing the shared state file.
#[derive(Parser, Debug)]
#[command(about = "Print the shared state file, optionally editing it first")]
pub struct StateArgs {
    /// Config file path (defaults apply when the file is absent)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Set entries before printing (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Remove entries before printing (repeatable)
    #[arg(long = "unset", value_name = "KEY")]
    pub unset: Vec<String>,
}
