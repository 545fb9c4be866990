//! Service activation

use super::{INSTALL_SERVICE_UNIT, Idempotency, RELOAD_START_ENABLE, SET_PERMISSIONS, Step};
use crate::classify::Outcome;
use crate::context::Context;
use crate::error::ProvisionError;

/// Reload systemd, then start and enable the exporter service
#[derive(Debug, Clone)]
pub struct ReloadStartEnable {
    /// Service name
    pub name: String,
    description: String,
}

impl ReloadStartEnable {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("Start and enable service {name}");
        Self { name, description }
    }
}

impl Step for ReloadStartEnable {
    fn name(&self) -> &'static str {
        RELOAD_START_ENABLE
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::ManagerSemantics
    }

    fn requires(&self) -> &'static [&'static str] {
        &[SET_PERMISSIONS, INSTALL_SERVICE_UNIT]
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        // A running service only picks up a new binary or unit on restart
        let start = if ctx.host_changed() { "restart" } else { "start" };

        ctx.exec(&["systemctl", "daemon-reload"])?;
        // Enable only after a successful start so startup failures surface
        ctx.exec(&["systemctl", start, &self.name])?;
        ctx.exec(&["systemctl", "enable", &self.name])?;
        Ok(Outcome::Success)
    }
}
