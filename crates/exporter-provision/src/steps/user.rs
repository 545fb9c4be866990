//! Service account step

use super::{ENSURE_USER, Idempotency, Step};
use crate::classify::{Outcome, SignatureClassifier};
use crate::context::Context;
use crate::error::ProvisionError;
use crate::runner::RunOptions;

/// Stderr of `useradd` when the account appeared between probe and create
const USER_EXISTS: &str = "already exists";

/// Ensure the dedicated no-login service account exists
#[derive(Debug, Clone)]
pub struct EnsureUser {
    /// Username; a group of the same name is expected
    pub name: String,
    description: String,
}

impl EnsureUser {
    /// Create a new user step
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("Ensure user {name} exists");
        Self { name, description }
    }

    /// An existing account is only usable if its same-named group exists,
    /// since both the ownership step and the unit file refer to it.
    fn check_group(&self, ctx: &Context<'_>) -> Result<Outcome, ProvisionError> {
        let group = ctx.exec_with(&["getent", "group", &self.name], &RunOptions::allow_failure())?;
        if group.success() {
            ctx.reporter()
                .info(&format!("User '{}' already exists, skipping", self.name));
            Ok(Outcome::ToleratedFailure(USER_EXISTS.into()))
        } else {
            Ok(Outcome::FatalFailure(format!(
                "user '{}' exists but group '{}' does not",
                self.name, self.name
            )))
        }
    }
}

impl Step for EnsureUser {
    fn name(&self) -> &'static str {
        ENSURE_USER
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::ProbeThenAct
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let probe = ctx.exec_with(&["id", &self.name], &RunOptions::allow_failure())?;
        if probe.success() {
            return self.check_group(ctx);
        }

        ctx.reporter()
            .info(&format!("User '{}' not found, creating", self.name));
        let outcome = ctx.exec_classified(
            &[
                "useradd",
                "--system",
                "--no-create-home",
                "--user-group",
                "--shell",
                "/bin/false",
                &self.name,
            ],
            RunOptions::default(),
            &SignatureClassifier::new([USER_EXISTS]),
        )?;

        match outcome {
            // Created concurrently; same rules as a pre-existing account
            Outcome::ToleratedFailure(_) => self.check_group(ctx),
            other => Ok(other),
        }
    }
}
