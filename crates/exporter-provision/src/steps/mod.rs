//! Provisioning step definitions
//!
//! Each step implements the [`Step`] trait and declares its own idempotency
//! strategy and whether its failure ends the run.

mod binary;
mod file;
mod firewall;
mod permissions;
mod service;
mod unit;
mod user;
mod verify;

pub use binary::InstallBinary;
pub use firewall::{ConfigureFirewall, firewalld_rich_rule, ufw_allow_args};
pub use permissions::SetPermissions;
pub use service::ReloadStartEnable;
pub use unit::InstallServiceUnit;
pub use user::EnsureUser;
pub use verify::Verify;

use std::fmt;

use crate::classify::Outcome;
use crate::config::ExporterConfig;
use crate::context::Context;
use crate::error::ProvisionError;

pub const ENSURE_USER: &str = "ensure-user";
pub const INSTALL_BINARY: &str = "install-binary";
pub const SET_PERMISSIONS: &str = "set-permissions";
pub const INSTALL_SERVICE_UNIT: &str = "install-service-unit";
pub const RELOAD_START_ENABLE: &str = "reload-start-enable";
pub const CONFIGURE_FIREWALL: &str = "configure-firewall";
pub const VERIFY: &str = "verify";

/// How a step stays safe to re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Query existing state first, act only when needed
    ProbeThenAct,
    /// Replace content in place
    Overwrite,
    /// Relies on the service manager's own semantics
    ManagerSemantics,
    /// Guarded by host detection
    Guarded,
    /// Changes nothing
    ReadOnly,
}

impl fmt::Display for Idempotency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProbeThenAct => "probe then act",
            Self::Overwrite => "overwrite",
            Self::ManagerSemantics => "service manager",
            Self::Guarded => "backend detection",
            Self::ReadOnly => "read-only",
        })
    }
}

/// A single provisioning step
pub trait Step {
    /// Stable identifier, recorded in the run result
    fn name(&self) -> &'static str;

    /// Human-readable description of what this step does
    fn description(&self) -> &str;

    fn idempotency(&self) -> Idempotency;

    /// Whether a failure of this step ends the run
    fn fatal_on_failure(&self) -> bool {
        true
    }

    /// Steps that must have completed before this one runs
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reason to skip the step entirely for `config`, if any
    fn skip_reason(&self, _config: &ExporterConfig) -> Option<String> {
        None
    }

    /// Apply the step
    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError>;
}
