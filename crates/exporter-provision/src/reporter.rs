//! Progress reporting seam
//!
//! The library never prints. Frontends implement [`Reporter`] to show progress;
//! every method has a no-op default.

use crate::classify::Outcome;
use crate::runner::CommandResult;

#[allow(unused_variables)]
pub trait Reporter {
    /// A step is about to run (`index` is 1-based)
    fn step_started(&self, index: usize, total: usize, name: &str, description: &str) {}

    /// A step finished with `outcome`
    fn step_finished(&self, index: usize, total: usize, name: &str, outcome: &Outcome) {}

    /// A step was not run
    fn step_skipped(&self, index: usize, total: usize, name: &str, reason: &str) {}

    /// A command is about to be executed
    fn command(&self, argv: &[&str]) {}

    /// Output of a command that exited 0
    fn command_output(&self, result: &CommandResult) {}

    /// A command exited non-zero
    fn command_failed(&self, argv: &[&str], result: &CommandResult) {}

    /// Operator-facing message
    fn info(&self, message: &str) {}

    /// Something the operator must act on
    fn warn(&self, message: &str) {}
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}
