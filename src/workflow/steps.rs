//! The six workflow steps.
//!
//! A step returns `Ok(true)` on success, `Ok(false)` on a clean failure it
//! already logged, and `Err` for anything unexpected; the sequencer converts
//! the latter into a step failure. Steps are not retried.

use super::WorkflowContext;
use crate::poll::PollOutcome;
use crate::runlog::{Level, RunLog};
use crate::runner::StepResult;
use crate::scrape;
use crate::state;
use anyhow::Result;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Step {
    CreateProduct,
    CreateOffer,
    CreateOpportunity,
    AssociateOffer,
    SearchAgreement,
    UpdateOpportunity,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::CreateProduct,
        Step::CreateOffer,
        Step::CreateOpportunity,
        Step::AssociateOffer,
        Step::SearchAgreement,
        Step::UpdateOpportunity,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Step::CreateProduct => "Create SaaS Product",
            Step::CreateOffer => "Create Private Offer",
            Step::CreateOpportunity => "Create and Submit Opportunity",
            Step::AssociateOffer => "Associate Offer to Opportunity",
            Step::SearchAgreement => "Search for Agreement",
            Step::UpdateOpportunity => "Update Opportunity to Committed",
        }
    }

    pub fn run(self, ctx: &mut WorkflowContext) -> Result<bool> {
        match self {
            Step::CreateProduct => create_product(ctx),
            Step::CreateOffer => create_offer(ctx),
            Step::CreateOpportunity => create_opportunity(ctx),
            Step::AssociateOffer => associate_offer(ctx),
            Step::SearchAgreement => search_agreement(ctx),
            Step::UpdateOpportunity => update_opportunity(ctx),
        }
    }
}

fn banner(log: &RunLog, title: &str) {
    let rule = "=".repeat(80);
    log.log(Level::Info, &rule);
    log.log(Level::Info, title);
    log.log(Level::Info, &rule);
}

/// Run a script that must exit zero; logs `failure` and yields `None` on a
/// non-zero exit.
fn run_required(
    ctx: &WorkflowContext,
    script: &Path,
    args: &[&str],
    failure: &str,
) -> Result<Option<StepResult>> {
    let result = ctx.run_script(script, args)?;
    if !result.success() {
        ctx.log.log(Level::Error, failure);
        return Ok(None);
    }
    Ok(Some(result))
}

/// Whether a poll outcome lets the step continue. FAILED and TIMEOUT are
/// reported distinctly; neither is retried here.
fn poll_succeeded(log: &RunLog, outcome: PollOutcome) -> bool {
    match outcome {
        PollOutcome::Succeeded => true,
        PollOutcome::Failed => {
            log.log(Level::Error, "Changeset reached FAILED; aborting workflow");
            false
        }
        PollOutcome::TimedOut => {
            log.log(
                Level::Error,
                "Polling budget exhausted before a terminal status; re-run describe manually to determine the outcome",
            );
            false
        }
        PollOutcome::Cancelled => false,
    }
}

fn create_product(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 1: Create SaaS Product");

    let script = ctx.config.scripts.create_product.clone();
    let Some(result) = run_required(ctx, &script, &[], "Failed to start product creation")? else {
        return Ok(false);
    };

    let Some(changeset_id) = scrape::changeset_id(&result.stdout) else {
        ctx.log.log(Level::Error, "Could not extract changeset ID");
        return Ok(false);
    };
    ctx.log
        .log(Level::Info, &format!("Changeset ID: {changeset_id}"));
    ctx.state.set(state::PRODUCT_CHANGESET_ID, &changeset_id)?;

    let describe = ctx.config.scripts.describe_product_changeset.clone();
    let outcome = ctx.poll(&changeset_id, &describe);
    if !poll_succeeded(&ctx.log, outcome) {
        return Ok(false);
    }

    let result = ctx.run_script(&describe, &[&changeset_id])?;
    match scrape::product_id(&result.stdout) {
        Some(product_id) => {
            ctx.log
                .log(Level::Info, &format!("Product ID: {product_id}"));
            ctx.state.set(state::PRODUCT_ID, &product_id)?;
        }
        None => ctx.log.log(Level::Warn, "Could not extract product ID"),
    }
    Ok(true)
}

fn create_offer(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 2: Create Private Offer");

    if ctx.state.get(state::PRODUCT_ID).is_none() {
        ctx.log.log(
            Level::Error,
            &format!(
                "PRODUCT_ID not found in {}; run the create-product step first",
                ctx.state.path().display()
            ),
        );
        return Ok(false);
    }

    let script = ctx.config.scripts.create_offer.clone();
    let Some(result) =
        run_required(ctx, &script, &[], "Failed to start private offer creation")?
    else {
        return Ok(false);
    };

    let Some(changeset_id) = scrape::changeset_id(&result.stdout) else {
        ctx.log.log(Level::Error, "Could not extract changeset ID");
        return Ok(false);
    };
    ctx.log
        .log(Level::Info, &format!("Changeset ID: {changeset_id}"));
    ctx.state.set(state::OFFER_CHANGESET_ID, &changeset_id)?;

    let describe = ctx.config.scripts.describe_offer_changeset.clone();
    let outcome = ctx.poll(&changeset_id, &describe);
    if !poll_succeeded(&ctx.log, outcome) {
        return Ok(false);
    }

    let result = ctx.run_script(&describe, &[&changeset_id])?;
    match scrape::offer_id(&result.stdout) {
        Some(offer_id) => {
            ctx.log.log(Level::Info, &format!("Offer ID: {offer_id}"));
            ctx.state.set(state::OFFER_ID, &offer_id)?;

            // Offer ARN is needed later for association; best-effort.
            let describe_offer = ctx.config.scripts.describe_offer.clone();
            let result = ctx.run_script(&describe_offer, &[&offer_id])?;
            match scrape::offer_arn(&result.stdout) {
                Some(offer_arn) => {
                    ctx.log
                        .log(Level::Info, &format!("Offer ARN: {offer_arn}"));
                    ctx.state.set(state::OFFER_ARN, &offer_arn)?;
                }
                None => ctx.log.log(Level::Warn, "Could not extract offer ARN"),
            }
        }
        None => ctx.log.log(Level::Warn, "Could not extract offer ID"),
    }
    Ok(true)
}

fn create_opportunity(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 3: Create and Submit Opportunity");

    ctx.log.log(Level::Info, "--- 3.1: Create Opportunity ---");
    let script = ctx.config.scripts.create_opportunity.clone();
    let Some(result) = run_required(ctx, &script, &[], "Failed to create opportunity")? else {
        return Ok(false);
    };
    let Some(opportunity_id) = scrape::opportunity_id(&result.stdout) else {
        ctx.log.log(Level::Error, "Invalid opportunity ID");
        return Ok(false);
    };
    ctx.log
        .log(Level::Info, &format!("Opportunity ID: {opportunity_id}"));
    ctx.state.set(state::OPPORTUNITY_ID, &opportunity_id)?;

    ctx.log.log(Level::Info, "--- 3.2: List Solutions ---");
    let script = ctx.config.scripts.list_solutions.clone();
    let Some(result) = run_required(ctx, &script, &[], "Failed to list solutions")? else {
        return Ok(false);
    };
    if let Some(solution_id) = scrape::solution_id(&result.stdout) {
        ctx.log
            .log(Level::Info, &format!("Solution ID: {solution_id}"));
        ctx.state.set(state::SOLUTION_ID, &solution_id)?;
    }

    ctx.log.log(Level::Info, "--- 3.3: Associate Opportunity ---");
    let script = ctx.config.scripts.associate_opportunity.clone();
    if run_required(ctx, &script, &[], "Failed to associate opportunity")?.is_none() {
        return Ok(false);
    }

    ctx.log.log(Level::Info, "--- 3.4: Start Engagement ---");
    let script = ctx.config.scripts.start_engagement.clone();
    if run_required(ctx, &script, &[], "Failed to start engagement")?.is_none() {
        return Ok(false);
    }

    ctx.log.log(Level::Info, "--- 3.5: Simulate AWS Approval ---");
    let script = ctx.config.scripts.simulate_approval.clone();
    if run_required(ctx, &script, &[], "Failed to simulate approval")?.is_none() {
        return Ok(false);
    }

    Ok(true)
}

fn associate_offer(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 4: Associate Private Offer to Opportunity");

    ctx.log.log(Level::Info, "--- 4.1: Associate Opportunity ---");
    let script = ctx.config.scripts.associate_offer.clone();
    if run_required(ctx, &script, &[], "Failed to associate opportunity")?.is_none() {
        return Ok(false);
    }

    // The verification read is optional in the sample layout.
    let get_script = ctx.config.scripts.get_opportunity.clone();
    if ctx.script_exists(&get_script) {
        ctx.log.log(Level::Info, "--- 4.2: Get Opportunity ---");
        if run_required(ctx, &get_script, &[], "Failed to get opportunity")?.is_none() {
            return Ok(false);
        }
    }

    Ok(true)
}

fn search_agreement(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 5: Search for Agreement");

    let Some(offer_id) = ctx.state.get(state::OFFER_ID).map(str::to_string) else {
        ctx.log.log(
            Level::Error,
            &format!(
                "OFFER_ID not found in {}; run the create-offer step first",
                ctx.state.path().display()
            ),
        );
        return Ok(false);
    };

    let script = ctx.config.scripts.search_agreements.clone();
    let Some(result) = run_required(ctx, &script, &[&offer_id], "Failed to search agreements")?
    else {
        return Ok(false);
    };

    // Buyer acceptance is an out-of-band manual action in the demo, so a
    // non-ACTIVE agreement is reported but does not abort the workflow.
    if result.stdout.contains("ACTIVE") {
        ctx.log.log(Level::Success, "Agreement is ACTIVE");
    } else {
        ctx.log.log(Level::Warn, "Agreement not yet ACTIVE");
        ctx.log.log(
            Level::Info,
            "Note: Buyer needs to accept the offer for agreement to be ACTIVE",
        );
    }
    Ok(true)
}

fn update_opportunity(ctx: &mut WorkflowContext) -> Result<bool> {
    banner(&ctx.log, "STEP 6: Update Opportunity to Committed");

    let script = ctx.config.scripts.update_opportunity.clone();
    Ok(run_required(ctx, &script, &[], "Failed to update opportunity")?.is_some())
}
