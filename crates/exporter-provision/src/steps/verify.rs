//! Post-install checks

use super::{Idempotency, Step, VERIFY};
use crate::classify::Outcome;
use crate::config::ExporterConfig;
use crate::context::Context;
use crate::error::ProvisionError;
use crate::runner::RunOptions;

/// Report service status, the listening socket and the metrics endpoint.
///
/// Read-only and soft: problems are reported, never fatal.
#[derive(Debug, Clone)]
pub struct Verify {
    description: String,
}

impl Verify {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            description: format!("Verify {} on port {}", config.service_name(), config.port),
        }
    }
}

impl Step for Verify {
    fn name(&self) -> &'static str {
        VERIFY
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::ReadOnly
    }

    fn fatal_on_failure(&self) -> bool {
        false
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let config = ctx.config();
        let port = config.port;
        let allow = RunOptions::allow_failure();
        let mut problems = vec![];

        let status = ctx.exec_with(
            &["systemctl", "status", config.service_name(), "--no-pager"],
            &allow,
        )?;
        if !status.success() {
            problems.push(format!("service is not active (exit code {})", status.exit_code));
        }

        let sockets = ctx.exec_with(&["ss", "-tlpn"], &allow)?;
        let needle = format!(":{port} ");
        if !sockets.stdout.lines().any(|line| line.contains(&needle)) {
            problems.push(format!("nothing is listening on port {port}"));
        }

        let url = config.metrics_url();
        let probe = ctx.exec_with(
            &[
                "curl",
                "-fsS",
                "--max-time",
                "5",
                "-o",
                "/dev/null",
                "-w",
                "%{http_code}",
                &url,
            ],
            &allow,
        )?;
        if probe.success() {
            ctx.reporter()
                .info(&format!("{url} answered HTTP {}", probe.stdout.trim()));
        } else {
            problems.push(format!("{url} is not reachable"));
        }

        if problems.is_empty() {
            Ok(Outcome::Success)
        } else {
            Ok(Outcome::FatalFailure(problems.join("; ")))
        }
    }
}
