//! Step sequencing for the opportunity-to-offer workflow.
//!
//! Each step drives one or more external scripts and records what it learned
//! in the shared state file, so a failed run can resume from the failed step.
mod context;
mod run;
mod steps;

pub use context::WorkflowContext;
pub use run::run_workflow;
pub use steps::Step;
