//! Provisioning manifest - the fixed step sequence and its runner

use crate::classify::Outcome;
use crate::config::ExporterConfig;
use crate::context::Context;
use crate::error::ProvisionError;
use crate::steps::{
    ConfigureFirewall, EnsureUser, InstallBinary, InstallServiceUnit, ReloadStartEnable,
    SetPermissions, Step, Verify,
};

/// What happened to one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step ran with this outcome
    Ran(Outcome),
    /// The step did not apply to this run
    Skipped(String),
    /// A precondition was missing, the step did not run
    Blocked(String),
}

/// Per-step record kept for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: &'static str,
    pub fatal_on_failure: bool,
    pub status: StepStatus,
}

/// Result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Steps that succeeded or failed in a tolerated way, in order
    pub completed_steps: Vec<&'static str>,
    /// Steps that did not apply to this run
    pub skipped_steps: Vec<&'static str>,
    /// Soft steps that failed, with the reason
    pub soft_failures: Vec<(&'static str, String)>,
    /// The step that ended the run, if any
    pub failed_at: Option<&'static str>,
    /// Why the run ended early
    pub failure: Option<String>,
    pub reports: Vec<StepReport>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.failed_at.is_none()
    }

    fn record(&mut self, step: &dyn Step, status: StepStatus) {
        self.reports.push(StepReport {
            name: step.name(),
            fatal_on_failure: step.fatal_on_failure(),
            status,
        });
    }

    fn abort(&mut self, step: &dyn Step, reason: String) {
        tracing::debug!(step = step.name(), %reason, "run aborted");
        self.failed_at = Some(step.name());
        self.failure = Some(reason);
    }
}

/// Ordered list of provisioning steps
#[derive(Default)]
pub struct Manifest {
    pub steps: Vec<Box<dyn Step>>,
}

impl Manifest {
    /// Create a new empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step to the manifest
    pub fn add_step<S: Step + 'static>(&mut self, step: S) {
        self.steps.push(Box::new(step));
    }

    /// Add a step fluently
    pub fn with_step<S: Step + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// The node_exporter provisioning sequence.
    ///
    /// The order is fixed: account, binary, permissions, unit, service,
    /// firewall, verification.
    pub fn node_exporter(config: &ExporterConfig) -> Self {
        Self::new()
            .with_step(EnsureUser::new(&config.service_user))
            .with_step(InstallBinary::new(config))
            .with_step(SetPermissions::new(&config.service_user))
            .with_step(InstallServiceUnit::new(config))
            .with_step(ReloadStartEnable::new(config.service_name()))
            .with_step(ConfigureFirewall::new(config))
            .with_step(Verify::new(config))
    }

    /// Run every step in order, stopping at the first fatal failure.
    ///
    /// Nothing applied before a failure is rolled back.
    pub fn run_all(&self, ctx: &mut Context<'_>) -> RunResult {
        let total = self.steps.len();
        let reporter = ctx.reporter();
        let mut result = RunResult::default();

        for (i, step) in self.steps.iter().enumerate() {
            let step = step.as_ref();
            let index = i + 1;
            let name = step.name();

            if let Some(reason) = step.skip_reason(ctx.config()) {
                reporter.step_skipped(index, total, name, &reason);
                result.skipped_steps.push(name);
                result.record(step, StepStatus::Skipped(reason));
                continue;
            }

            // Static check against the fixed order
            if let Some(missing) = step
                .requires()
                .iter()
                .copied()
                .find(|req| !result.completed_steps.contains(req))
            {
                let reason = ProvisionError::PreconditionUnmet {
                    step: name,
                    missing,
                }
                .to_string();
                reporter.step_skipped(index, total, name, &reason);
                result.record(step, StepStatus::Blocked(reason.clone()));
                result.abort(step, reason);
                return result;
            }

            reporter.step_started(index, total, name, step.description());
            let (outcome, always_fatal) = match step.run(ctx) {
                Ok(outcome) => (outcome, false),
                Err(err) => (Outcome::FatalFailure(err.to_string()), err.is_always_fatal()),
            };
            reporter.step_finished(index, total, name, &outcome);
            result.record(step, StepStatus::Ran(outcome.clone()));

            match outcome {
                Outcome::FatalFailure(reason) if step.fatal_on_failure() || always_fatal => {
                    result.abort(step, reason);
                    return result;
                }
                Outcome::FatalFailure(reason) => {
                    tracing::warn!(step = name, %reason, "soft step failed, continuing");
                    reporter.warn(&format!("{name} failed, continuing: {reason}"));
                    result.soft_failures.push((name, reason));
                }
                Outcome::ToleratedFailure(_) | Outcome::Success => {
                    result.completed_steps.push(name);
                }
            }
        }

        result
    }
}
