//! Workflow configuration and the argument/state/default resolution order.
//!
//! Configuration lives in an explicit `workflow.json` next to the step
//! scripts; a missing file means defaults, a present but unparsable file is
//! an error. Identifier inputs resolve explicit argument > shared state >
//! hard-coded default, uniformly across commands.

use crate::poll::{PollConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use crate::state::WorkflowState;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "workflow.json";
pub const DEFAULT_STATE_FILE: &str = "shared_env.json";
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Sample changeset id from the upstream describe-changeset usage text;
/// the last-resort fallback when neither an argument nor state supplies one.
pub const DEFAULT_CHANGESET_ID: &str = "2irc20n325n8znc4fi4q0o3bb";

/// Environment key handed to every step script carrying the token mode.
pub const CLIENT_TOKEN_MODE_ENV: &str = "CLIENT_TOKEN_MODE";

/// Retry-idempotency choice for the create calls. `Fresh` asks scripts to
/// mint a new client token per invocation (a re-run creates a duplicate
/// remote resource); `Stable` asks them to derive a repeatable one so
/// retries dedupe server-side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientTokenMode {
    #[default]
    Fresh,
    Stable,
}

impl ClientTokenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Stable => "stable",
        }
    }
}

/// Paths of the step scripts, relative to `scripts_dir`. Defaults mirror
/// the upstream opportunity-to-offer sample layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptCatalog {
    pub create_product: PathBuf,
    pub describe_product_changeset: PathBuf,
    pub create_offer: PathBuf,
    pub describe_offer_changeset: PathBuf,
    pub describe_offer: PathBuf,
    pub create_opportunity: PathBuf,
    pub list_solutions: PathBuf,
    pub associate_opportunity: PathBuf,
    pub start_engagement: PathBuf,
    pub simulate_approval: PathBuf,
    pub associate_offer: PathBuf,
    pub get_opportunity: PathBuf,
    pub search_agreements: PathBuf,
    pub update_opportunity: PathBuf,
}

impl Default for ScriptCatalog {
    fn default() -> Self {
        Self {
            // `Procuct` is how the upstream sample repo spells this directory.
            create_product: "1_publishSaasProcuct/start_changeset.py".into(),
            describe_product_changeset: "1_publishSaasProcuct/describe_changeset.py".into(),
            create_offer: "2_createPrivateOffer/start_changeset.py".into(),
            describe_offer_changeset: "2_createPrivateOffer/describe_changeset.py".into(),
            describe_offer: "2_createPrivateOffer/describe_offer.py".into(),
            create_opportunity: "3_createOpportunity/1_create_opportunity.py".into(),
            list_solutions: "3_createOpportunity/2_list_solutions.py".into(),
            associate_opportunity: "3_createOpportunity/3_associate_opportunity.py".into(),
            start_engagement: "3_createOpportunity/4_start_engagement_from_opportunity_task.py"
                .into(),
            simulate_approval: "3_createOpportunity/aws_simulate_approval_update_opportunity.py"
                .into(),
            associate_offer: "4_associatePrivateOfferToOpportunity/associate_opportunity.py"
                .into(),
            get_opportunity: "4_associatePrivateOfferToOpportunity/get_opportunity.py".into(),
            search_agreements: "5_buyerAcceptPrivateOffer/search_agreements_by_offer_id.py"
                .into(),
            update_opportunity: "6_updateOpportunity/update_opportunity_to_committed.py".into(),
        }
    }
}

/// Full workflow configuration. Every field has a default so a partial
/// `workflow.json` stays valid.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub scripts_dir: PathBuf,
    pub state_file: PathBuf,
    pub log_dir: PathBuf,
    /// Interpreter command line for the step scripts, e.g. `python3 -u`.
    pub interpreter: String,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub client_token_mode: ClientTokenMode,
    pub scripts: ScriptCatalog,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            scripts_dir: ".".into(),
            state_file: DEFAULT_STATE_FILE.into(),
            log_dir: ".".into(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            client_token_mode: ClientTokenMode::default(),
            scripts: ScriptCatalog::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
        }
    }
}

pub fn load_config(path: &Path) -> Result<WorkflowConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: WorkflowConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Defaults when the config file is absent; errors only on a present but
/// invalid file.
pub fn load_config_optional(path: &Path) -> Result<WorkflowConfig> {
    if !path.is_file() {
        return Ok(WorkflowConfig::default());
    }
    load_config(path)
}

pub fn validate_config(config: &WorkflowConfig) -> Result<()> {
    if config.interpreter.trim().is_empty() {
        return Err(anyhow!("interpreter must not be empty"));
    }
    if config.poll_max_attempts == 0 {
        return Err(anyhow!("poll_max_attempts must be at least 1"));
    }
    Ok(())
}

/// Write a default `workflow.json` for operators to edit.
pub fn write_config_stub(path: &Path, force: bool) -> Result<()> {
    if path.is_file() && !force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(&WorkflowConfig::default())
        .context("serialize config stub")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Canonical three-tier identifier resolution: explicit argument (non-empty
/// after trim) > shared state > hard-coded default.
pub fn resolve_identifier<'a>(
    explicit: Option<&'a str>,
    state: &'a WorkflowState,
    key: &str,
    fallback: &'a str,
) -> &'a str {
    if let Some(value) = explicit.map(str::trim).filter(|value| !value.is_empty()) {
        return value;
    }
    if let Some(value) = state.get(key) {
        return value;
    }
    fallback
}
