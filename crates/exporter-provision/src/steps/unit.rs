//! systemd unit file

use super::file::place_file;
use super::{INSTALL_BINARY, INSTALL_SERVICE_UNIT, Idempotency, Step};
use crate::classify::Outcome;
use crate::config::ExporterConfig;
use crate::context::Context;
use crate::error::ProvisionError;
use crate::render;

/// Write the rendered service unit
#[derive(Debug, Clone)]
pub struct InstallServiceUnit {
    description: String,
}

impl InstallServiceUnit {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            description: format!("Write {}", config.unit_path.display()),
        }
    }
}

impl Step for InstallServiceUnit {
    fn name(&self) -> &'static str {
        INSTALL_SERVICE_UNIT
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::Overwrite
    }

    fn requires(&self) -> &'static [&'static str] {
        &[INSTALL_BINARY]
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let config = ctx.config();
        let unit = render::service_unit(config)?;

        if place_file(&config.unit_path, unit.as_bytes(), 0o644)? {
            ctx.reporter()
                .info(&format!("Wrote {}", config.unit_path.display()));
            ctx.mark_changed();
        } else {
            ctx.reporter().info("Service unit is already up to date");
        }
        Ok(Outcome::Success)
    }
}
