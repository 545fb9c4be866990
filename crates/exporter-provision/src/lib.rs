//! Exporter Provision - idempotent node_exporter installation
//!
//! This crate installs a Prometheus node_exporter as a systemd service on the
//! local host, one idempotent step at a time, so a run can be repeated safely.
//!
//! # Architecture
//!
//! - [`CommandRunner`]: executes host commands and captures their output
//! - [`classify`] module: decides which command failures mean "already done"
//! - [`Step`] trait and [`steps`] module: one unit per provisioning action
//! - [`FirewallSelector`]: picks ufw or firewalld, once per run
//! - [`Manifest`]: the fixed step sequence and its runner
//! - [`ExporterConfig`]: immutable configuration for one run
//!
//! # Example
//!
//! ```ignore
//! use exporter_provision::{Context, ExporterConfig, Manifest, NullReporter, SystemRunner};
//!
//! let config = ExporterConfig::builder()
//!     .allow_source(Some("10.0.0.5".parse()?))
//!     .build();
//!
//! let runner = SystemRunner::new();
//! let mut ctx = Context::new(&config, &runner, &NullReporter);
//! let result = Manifest::node_exporter(&config).run_all(&mut ctx);
//! assert!(result.succeeded());
//! ```

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod firewall;
pub mod manifest;
pub mod render;
pub mod reporter;
pub mod runner;
pub mod steps;

#[cfg(test)]
mod testing;

pub use classify::{FailureClassifier, Outcome, classify};
pub use config::{AllowSource, BinarySource, ExporterConfig};
pub use context::Context;
pub use error::{ExecError, ProvisionError};
pub use firewall::{FirewallBackend, FirewallSelector, FirewallState};
pub use manifest::{Manifest, RunResult, StepReport, StepStatus};
pub use reporter::{NullReporter, Reporter};
pub use runner::{CommandResult, CommandRunner, RunOptions, SystemRunner};
pub use steps::Step;
