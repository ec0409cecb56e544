//! Top-level sequencer: six ordered steps, first failure aborts.

use super::{Step, WorkflowContext};
use crate::runlog::Level;
use anyhow::Result;

/// Run the workflow from `from` (or the beginning) through the last step.
/// Returns `Ok(false)` on the first failing step; step errors are caught
/// here, logged with their full chain, and treated as failures so the
/// process always reaches its own exit path.
pub fn run_workflow(ctx: &mut WorkflowContext, from: Option<Step>) -> Result<bool> {
    let total = Step::ALL.len();
    let rule = "=".repeat(80);
    ctx.log.log(Level::Info, &rule);
    ctx.log
        .log(Level::Info, "AWS MARKETPLACE OPPORTUNITY TO OFFER WORKFLOW");
    ctx.log.log(Level::Info, &rule);
    ctx.log
        .log(Level::Info, &format!("Log file: {}", ctx.log.path().display()));
    ctx.log.log(
        Level::Info,
        &format!("Shared state: {}", ctx.state.path().display()),
    );

    let start = match from {
        Some(step) => Step::ALL
            .iter()
            .position(|candidate| *candidate == step)
            .unwrap_or(0),
        None => 0,
    };

    for (index, step) in Step::ALL.iter().enumerate().skip(start) {
        let number = index + 1;
        if ctx.cancel.is_cancelled() {
            ctx.log.log(Level::Warn, "Workflow interrupted by user");
            return Ok(false);
        }
        ctx.log.log(
            Level::Info,
            &format!("STEP {number}/{total}: {}", step.title()),
        );
        match step.run(ctx) {
            Ok(true) => {
                ctx.log.log(
                    Level::Success,
                    &format!("Step {number} completed successfully"),
                );
            }
            Ok(false) => {
                if ctx.cancel.is_cancelled() {
                    ctx.log.log(Level::Warn, "Workflow interrupted by user");
                } else {
                    ctx.log.log(
                        Level::Error,
                        &format!("Workflow failed at Step {number}: {}", step.title()),
                    );
                    ctx.log.log(
                        Level::Info,
                        &format!("Check log file for details: {}", ctx.log.path().display()),
                    );
                }
                return Ok(false);
            }
            Err(err) => {
                ctx.log.log(
                    Level::Error,
                    &format!("Exception in Step {number}: {}", step.title()),
                );
                ctx.log.log(Level::Error, &format!("Error: {err:?}"));
                return Ok(false);
            }
        }
    }

    ctx.log.log(Level::Success, "WORKFLOW COMPLETED SUCCESSFULLY");
    ctx.log.log_json("Shared state", ctx.state.values());
    Ok(true)
}
