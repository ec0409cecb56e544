use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::ExitCode;

mod cancel;
mod cli;
mod config;
mod poll;
mod runlog;
mod runner;
mod scrape;
mod state;
mod workflow;

use cancel::CancelFlag;
use cli::{Command, InitArgs, PollArgs, RootArgs, RunArgs, StateArgs};
use poll::PollOutcome;
use runlog::RunLog;
use state::{StateStore, WorkflowState};
use workflow::WorkflowContext;

fn main() -> ExitCode {
    init_tracing();
    cancel::install_sigint_handler();
    let args = RootArgs::parse();

    let outcome = match args.command {
        Command::Init(args) => cmd_init(args).map(|()| true),
        Command::Run(args) => cmd_run(args),
        Command::Poll(args) => cmd_poll(args),
        Command::State(args) => cmd_state(args).map(|()| true),
    };

    if cancel::interrupted() {
        return ExitCode::from(130);
    }
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_init(args: InitArgs) -> Result<()> {
    config::write_config_stub(&args.config, args.force)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<bool> {
    let mut config = config::load_config_optional(&args.config)?;
    if let Some(dir) = args.scripts_dir {
        config.scripts_dir = dir;
    }
    if let Some(path) = args.state_file {
        config.state_file = path;
    }
    if let Some(dir) = args.log_dir {
        config.log_dir = dir;
    }
    if let Some(secs) = args.interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(attempts) = args.max_attempts {
        config.poll_max_attempts = attempts;
    }
    config::validate_config(&config)?;

    let log = RunLog::create(&config.log_dir)?;
    let mut ctx = WorkflowContext::new(config, log, CancelFlag::new())?;
    workflow::run_workflow(&mut ctx, args.from)
}

fn cmd_poll(args: PollArgs) -> Result<bool> {
    let mut config = config::load_config_optional(&args.config)?;
    if let Some(secs) = args.interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(attempts) = args.max_attempts {
        config.poll_max_attempts = attempts;
    }
    config::validate_config(&config)?;

    let state = WorkflowState::load(StateStore::new(config.state_file.clone()));
    let changeset_id = config::resolve_identifier(
        args.changeset_id.as_deref(),
        &state,
        &args.state_key,
        config::DEFAULT_CHANGESET_ID,
    )
    .to_string();
    drop(state);

    let script = args
        .script
        .unwrap_or_else(|| config.scripts.describe_product_changeset.clone());
    let log = RunLog::create(&config.log_dir)?;
    let ctx = WorkflowContext::new(config, log, CancelFlag::new())?;
    let outcome = ctx.poll(&changeset_id, &script);
    Ok(outcome == PollOutcome::Succeeded)
}

fn cmd_state(args: StateArgs) -> Result<()> {
    let config = config::load_config_optional(&args.config)?;
    let mut state = WorkflowState::load(StateStore::new(config.state_file.clone()));
    for entry in &args.set {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid --set entry `{entry}` (expected KEY=VALUE)"))?;
        state.set(key.trim(), value.trim())?;
    }
    for key in &args.unset {
        state.unset(key)?;
    }
    let text = serde_json::to_string_pretty(state.values()).context("serialize shared state")?;
    println!("{text}");
    Ok(())
}
