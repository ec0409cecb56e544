//! Fixed-cadence polling of an asynchronous changeset.
//!
//! Completion time for a demo changeset is externally bounded, so the loop
//! runs a fixed interval with a hard attempt cap and no backoff. Transient
//! describe failures are warnings, not aborts: the next attempt may see a
//! healthy response.

use crate::cancel::CancelFlag;
use crate::runlog::{Level, RunLog};
use crate::runner::StepResult;
use crate::scrape;
use anyhow::Result;
use std::thread;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;

/// Catalog changeset lifecycle states. Transitions are monotonic:
/// PREPARING -> APPLYING -> {SUCCEEDED | FAILED}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangesetStatus {
    Preparing,
    Applying,
    Succeeded,
    Failed,
}

impl ChangesetStatus {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "PREPARING" => Some(Self::Preparing),
            "APPLYING" => Some(Self::Applying),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// How a polling session ended. TIMEOUT is reported distinctly from FAILED:
/// the remote operation may still complete after the budget runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Poll `describe` until a terminal status, the attempt budget, or
/// cancellation. The cancellation flag is checked at the top of every
/// iteration, never mid-sleep.
pub fn poll_changeset<F>(
    changeset_id: &str,
    cfg: &PollConfig,
    log: &RunLog,
    cancel: &CancelFlag,
    mut describe: F,
) -> PollOutcome
where
    F: FnMut() -> Result<StepResult>,
{
    log.log(
        Level::Info,
        &format!("Polling changeset {changeset_id} for completion..."),
    );

    for attempt in 1..=cfg.max_attempts {
        if cancel.is_cancelled() {
            log.log(Level::Warn, "Polling cancelled");
            return PollOutcome::Cancelled;
        }
        log.log(
            Level::Info,
            &format!("Poll attempt {attempt}/{}", cfg.max_attempts),
        );

        match describe() {
            Err(err) => {
                log.log(Level::Warn, &format!("Describe invocation failed: {err:#}"));
            }
            Ok(result) if !result.success() => {
                log.log(
                    Level::Warn,
                    "Describe exited non-zero; retrying on next attempt",
                );
            }
            Ok(result) => match scrape::status(&result.stdout) {
                None => {
                    log.log(Level::Warn, "Could not parse status from output");
                }
                Some(token) => match ChangesetStatus::parse(&token) {
                    Some(ChangesetStatus::Succeeded) => {
                        log.log(Level::Success, "Changeset succeeded");
                        return PollOutcome::Succeeded;
                    }
                    Some(ChangesetStatus::Failed) => {
                        log.log(Level::Error, "Changeset failed");
                        // Surface the full describe output for diagnosis.
                        log.log(
                            Level::Error,
                            &format!("FAILED CHANGESET DETAILS:\n{}", result.stdout),
                        );
                        return PollOutcome::Failed;
                    }
                    Some(_) => {
                        log.log(
                            Level::Info,
                            &format!("Changeset status: {token} (in progress)"),
                        );
                    }
                    None => {
                        log.log(Level::Warn, &format!("Unrecognized status: {token}"));
                    }
                },
            },
        }

        if attempt < cfg.max_attempts && !cfg.interval.is_zero() {
            log.log(
                Level::Info,
                &format!(
                    "Waiting {} seconds before next poll...",
                    cfg.interval.as_secs()
                ),
            );
            thread::sleep(cfg.interval);
        }
    }

    log.log(Level::Error, "Max poll attempts reached");
    PollOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runlog::RunLog;

    fn fast_cfg(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::ZERO,
            max_attempts,
        }
    }

    fn test_log() -> (tempfile::TempDir, RunLog) {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = RunLog::create(dir.path()).expect("create log");
        (dir, log)
    }

    fn ok_result(stdout: &str) -> Result<StepResult> {
        Ok(StepResult {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    /// Drives the poller with a scripted sequence of describe outputs.
    fn poll_scripted(outputs: Vec<Result<StepResult>>, max_attempts: u32) -> (PollOutcome, usize) {
        let (_dir, log) = test_log();
        let mut calls = 0usize;
        let mut remaining = outputs.into_iter();
        let outcome = poll_changeset(
            "cs-test",
            &fast_cfg(max_attempts),
            &log,
            &CancelFlag::new(),
            || {
                calls += 1;
                remaining.next().expect("script exhausted")
            },
        );
        (outcome, calls)
    }

    #[test]
    fn succeeded_returns_on_first_terminal_attempt() {
        let (outcome, calls) = poll_scripted(
            vec![
                ok_result("Status: PREPARING"),
                ok_result("Status: SUCCEEDED"),
                ok_result("Status: SUCCEEDED"),
            ],
            10,
        );
        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(calls, 2, "must stop at the first terminal status");
    }

    #[test]
    fn failed_is_terminal_immediately() {
        let (outcome, calls) = poll_scripted(vec![ok_result("Status: FAILED")], 10);
        assert_eq!(outcome, PollOutcome::Failed);
        assert_eq!(calls, 1);
    }

    #[test]
    fn preparing_and_applying_keep_looping() {
        let (outcome, calls) = poll_scripted(
            vec![
                ok_result("Status: PREPARING"),
                ok_result("Status: APPLYING"),
                ok_result("Status: SUCCEEDED"),
            ],
            10,
        );
        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(calls, 3);
    }

    #[test]
    fn budget_exhaustion_is_timeout_not_failed() {
        let (outcome, calls) = poll_scripted(
            vec![
                ok_result("Status: PREPARING"),
                ok_result("Status: APPLYING"),
                ok_result("Status: APPLYING"),
            ],
            3,
        );
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(calls, 3);
    }

    #[test]
    fn transient_describe_failures_do_not_abort() {
        let (outcome, calls) = poll_scripted(
            vec![
                Err(anyhow::anyhow!("spawn failed")),
                Ok(StepResult {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: "throttled".to_string(),
                }),
                ok_result("no status line here"),
                ok_result("Status: UNEXPECTED_TOKEN"),
                ok_result("Status: SUCCEEDED"),
            ],
            10,
        );
        assert_eq!(outcome, PollOutcome::Succeeded);
        assert_eq!(calls, 5);
    }

    #[test]
    fn cancellation_is_observed_before_each_attempt() {
        let (_dir, log) = test_log();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut calls = 0usize;
        let outcome = poll_changeset("cs-test", &fast_cfg(10), &log, &cancel, || {
            calls += 1;
            ok_result("Status: PREPARING")
        });
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(calls, 0);
    }

    #[test]
    fn status_parse_covers_known_tokens() {
        assert_eq!(
            ChangesetStatus::parse("PREPARING"),
            Some(ChangesetStatus::Preparing)
        );
        assert_eq!(
            ChangesetStatus::parse("APPLYING"),
            Some(ChangesetStatus::Applying)
        );
        assert!(ChangesetStatus::parse("SUCCEEDED")
            .expect("succeeded parses")
            .is_terminal());
        assert!(ChangesetStatus::parse("FAILED")
            .expect("failed parses")
            .is_terminal());
        assert_eq!(ChangesetStatus::parse("CANCELLED"), None);
    }
}
