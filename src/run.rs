//! Shared step runner for export, import and reset runs.
//!
//! A run walks its steps one at a time, logging each as `step: status detail`. The
//! [`FailurePolicy`] decides whether a failed step halts the run or lets later steps go on.

use std::fmt;
use std::ops::ControlFlow;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First failed step aborts the remaining steps.
    FailFast,
    /// Failures are recorded and later steps still run.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Started,
    Ok,
    Skipped,
    Warning,
    Failed,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Started => "started",
            StepStatus::Ok => "ok",
            StepStatus::Skipped => "skipped",
            StepStatus::Warning => "warning",
            StepStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    pub step: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl fmt::Display for StepLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}: {}", self.step, self.status.as_str())
        } else {
            write!(f, "{}: {} {}", self.step, self.status.as_str(), self.detail)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    PartialFailure,
    Aborted,
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RunState {
    Idle,
    Running { step: String },
    Completed(RunOutcome),
}

/// Everything a finished run hands to its report.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub log: Vec<StepLog>,
    pub errors: Vec<AppError>,
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct StepRunner {
    operation: &'static str,
    policy: FailurePolicy,
    state: RunState,
    log: Vec<StepLog>,
    errors: Vec<AppError>,
    warnings: Vec<String>,
    started: Instant,
}

impl StepRunner {
    pub fn new(operation: &'static str, policy: FailurePolicy) -> Self {
        Self {
            operation,
            policy,
            state: RunState::Idle,
            log: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn log(&self) -> &[StepLog] {
        &self.log
    }

    pub fn start(&mut self, step: impl Into<String>) {
        let step = step.into();
        tracing::debug!(
            target: "finvault",
            area = self.operation,
            event = "step_start",
            step = %step
        );
        self.state = RunState::Running { step };
    }

    pub fn complete(&mut self, detail: impl Into<String>) {
        let detail = detail.into();
        let step = self.current_step();
        tracing::info!(
            target: "finvault",
            area = self.operation,
            event = "step_ok",
            step = %step,
            detail = %detail
        );
        self.push(step, StepStatus::Ok, detail);
    }

    pub fn skip(&mut self, step: impl Into<String>, detail: impl Into<String>) {
        self.push(step.into(), StepStatus::Skipped, detail.into());
    }

    /// Records a failed step; `Break` means the policy halts the run here.
    pub fn fail(&mut self, error: AppError) -> ControlFlow<()> {
        let step = self.current_step();
        tracing::error!(
            target: "finvault",
            area = self.operation,
            event = "step_failed",
            step = %step,
            code = %error.code(),
            error = %error
        );
        self.push(step, StepStatus::Failed, error.message().to_string());
        self.errors.push(error);
        match self.policy {
            FailurePolicy::FailFast => {
                self.state = RunState::Completed(RunOutcome::Aborted);
                ControlFlow::Break(())
            }
            FailurePolicy::BestEffort => ControlFlow::Continue(()),
        }
    }

    /// Records a failure that ends the run whatever the policy.
    pub fn abort(&mut self, error: AppError) {
        let _ = self.fail(error);
        self.state = RunState::Completed(RunOutcome::Aborted);
    }

    /// Records a non-fatal problem under `step`.
    pub fn warn(&mut self, step: impl Into<String>, message: impl Into<String>) {
        let step = step.into();
        let message = message.into();
        tracing::warn!(
            target: "finvault",
            area = self.operation,
            event = "step_warning",
            step = %step,
            warning = %message
        );
        self.push(step, StepStatus::Warning, message.clone());
        self.warnings.push(message);
    }

    pub fn finish(mut self) -> RunSummary {
        let outcome = match self.state {
            RunState::Completed(RunOutcome::Aborted) => RunOutcome::Aborted,
            _ if self.errors.is_empty() => RunOutcome::Success,
            _ => RunOutcome::PartialFailure,
        };
        self.state = RunState::Completed(outcome);
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        tracing::info!(
            target: "finvault",
            area = self.operation,
            event = "run_finished",
            outcome = ?outcome,
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            ms = elapsed_ms
        );
        RunSummary {
            outcome,
            log: self.log,
            errors: self.errors,
            warnings: self.warnings,
            elapsed_ms,
        }
    }

    fn current_step(&self) -> String {
        match &self.state {
            RunState::Running { step } => step.clone(),
            _ => self.operation.to_string(),
        }
    }

    fn push(&mut self, step: String, status: StepStatus, detail: String) {
        self.log.push(StepLog {
            step,
            status,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_fast_breaks_and_aborts() {
        let mut runner = StepRunner::new("import", FailurePolicy::FailFast);
        runner.start("categories");
        runner.complete("3 rows");
        runner.start("accounts");
        let flow = runner.fail(AppError::new("STORE/WRITE", "boom"));
        assert!(flow.is_break());
        assert_eq!(runner.state, RunState::Completed(RunOutcome::Aborted));

        let summary = runner.finish();
        assert_eq!(summary.outcome, RunOutcome::Aborted);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.log[0].to_string(), "categories: ok 3 rows");
        assert_eq!(summary.log[1].to_string(), "accounts: failed boom");
    }

    #[test]
    fn best_effort_continues_to_partial_failure() {
        let mut runner = StepRunner::new("reset", FailurePolicy::BestEffort);
        runner.start("cost_centers");
        assert!(runner
            .fail(AppError::new("STORE/DELETE", "locked"))
            .is_continue());
        assert_eq!(runner.state, RunState::Running { step: "cost_centers".into() });
        runner.start("accounts");
        runner.complete("");
        let summary = runner.finish();
        assert_eq!(summary.outcome, RunOutcome::PartialFailure);
        assert_eq!(summary.log[1].to_string(), "accounts: ok");
    }

    #[test]
    fn abort_ignores_best_effort() {
        let mut runner = StepRunner::new("reset", FailurePolicy::BestEffort);
        runner.start("workspace");
        runner.abort(AppError::new("WORKSPACE/NOT_FOUND", "missing"));
        assert_eq!(runner.state, RunState::Completed(RunOutcome::Aborted));
        assert_eq!(runner.finish().outcome, RunOutcome::Aborted);
    }

    #[test]
    fn warnings_do_not_affect_outcome() {
        let mut runner = StepRunner::new("reset", FailurePolicy::BestEffort);
        assert_eq!(runner.state, RunState::Idle);
        runner.warn("backup", "disk full");
        let summary = runner.finish();
        assert_eq!(summary.outcome, RunOutcome::Success);
        assert_eq!(summary.warnings, vec!["disk full".to_string()]);
        assert_eq!(summary.log[0].status, StepStatus::Warning);
    }
}
