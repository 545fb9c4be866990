//! Run-scoped state handed to every step

use crate::classify::{FailureClassifier, Outcome};
use crate::config::ExporterConfig;
use crate::error::ExecError;
use crate::firewall::{FirewallBackend, FirewallSelector};
use crate::reporter::Reporter;
use crate::runner::{CommandResult, CommandRunner, RunOptions};

/// Everything a step may read or touch during one run
pub struct Context<'a> {
    config: &'a ExporterConfig,
    runner: &'a dyn CommandRunner,
    reporter: &'a dyn Reporter,
    firewall: FirewallSelector,
    changed: bool,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a ExporterConfig,
        runner: &'a dyn CommandRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            runner,
            reporter,
            firewall: FirewallSelector::new(),
            changed: false,
        }
    }

    pub fn config(&self) -> &'a ExporterConfig {
        self.config
    }

    pub fn reporter(&self) -> &'a dyn Reporter {
        self.reporter
    }

    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    /// Firewall back end, detected on first call
    pub fn firewall_backend(&mut self) -> FirewallBackend {
        self.firewall.detect(self.runner)
    }

    /// Record that host content (binary or unit) changed during this run
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn host_changed(&self) -> bool {
        self.changed
    }

    /// Run a command that must succeed
    pub fn exec(&self, argv: &[&str]) -> Result<CommandResult, ExecError> {
        self.exec_with(argv, &RunOptions::default())
    }

    /// Echo, run and report a command
    pub fn exec_with(
        &self,
        argv: &[&str],
        options: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        self.reporter.command(argv);

        match self.runner.run(argv, options) {
            Ok(result) => {
                if result.success() {
                    self.reporter.command_output(&result);
                } else {
                    self.reporter.command_failed(argv, &result);
                }
                Ok(result)
            }
            Err(err) => {
                if let ExecError::CommandFailed {
                    exit_code,
                    stdout,
                    stderr,
                    ..
                } = &err
                {
                    let result = CommandResult::new(*exit_code, stdout.clone(), stderr.clone());
                    self.reporter.command_failed(argv, &result);
                }
                Err(err)
            }
        }
    }

    /// Run a command whose failure is judged by `classifier`
    pub fn exec_classified(
        &self,
        argv: &[&str],
        options: RunOptions,
        classifier: &dyn FailureClassifier,
    ) -> Result<Outcome, ExecError> {
        let options = RunOptions {
            allow_failure: true,
            ..options
        };
        let result = self.exec_with(argv, &options)?;
        let outcome = classifier.classify(&result);
        if let Outcome::ToleratedFailure(reason) = &outcome {
            tracing::debug!(?argv, reason = %reason, "tolerated command failure");
        }
        Ok(outcome)
    }
}
