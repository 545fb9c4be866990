//! Firewall allow-listing for the exporter port

use super::{CONFIGURE_FIREWALL, Idempotency, Step};
use crate::classify::{ExitCodeClassifier, Outcome, SignatureClassifier};
use crate::config::{AllowSource, ExporterConfig};
use crate::context::Context;
use crate::error::ProvisionError;
use crate::firewall::FirewallBackend;
use crate::runner::RunOptions;

/// firewall-cmd exit code for a rule that is already present
const FIREWALLD_ALREADY_ENABLED: i32 = 11;

/// Arguments to `ufw` allowing `source` to reach `port`
pub fn ufw_allow_args(source: &AllowSource, port: u16) -> Vec<String> {
    let source = source.to_string();
    let port = port.to_string();
    [
        "allow",
        "from",
        source.as_str(),
        "to",
        "any",
        "port",
        port.as_str(),
        "proto",
        "tcp",
    ]
    .map(String::from)
    .into()
}

/// firewalld rich rule allowing `source` to reach `port`
pub fn firewalld_rich_rule(source: &AllowSource, port: u16) -> String {
    format!(
        r#"rule family="{}" source address="{source}" port port="{port}" protocol="tcp" accept"#,
        source.family()
    )
}

/// Restrict the exporter port to an allow-listed source address.
///
/// Soft: a missing back end or a failed rule only produces a warning.
#[derive(Debug, Clone)]
pub struct ConfigureFirewall {
    description: String,
}

impl ConfigureFirewall {
    pub fn new(config: &ExporterConfig) -> Self {
        let description = match &config.allow_source {
            Some(source) => format!("Allow {source} to port {}/tcp", config.port),
            None => "Configure firewall".into(),
        };
        Self { description }
    }

    fn ufw(ctx: &Context<'_>, source: &AllowSource, port: u16) -> Result<Outcome, ProvisionError> {
        ctx.reporter().info("Detected ufw, installing rule");

        let args = ufw_allow_args(source, port);
        let argv: Vec<&str> = std::iter::once("ufw")
            .chain(args.iter().map(String::as_str))
            .collect();
        ctx.exec(&argv)?;

        // Answer the interactive confirmation prompt
        let enable = ctx.exec_classified(
            &["ufw", "enable"],
            RunOptions::default().with_stdin("y\n"),
            &SignatureClassifier::strict(),
        )?;

        // Current rules are shown even when enabling failed
        ctx.exec_with(&["ufw", "status"], &RunOptions::allow_failure())?;
        Ok(enable)
    }

    fn firewalld(
        ctx: &Context<'_>,
        source: &AllowSource,
        port: u16,
    ) -> Result<Outcome, ProvisionError> {
        ctx.reporter().info("Detected firewalld, installing rule");

        let rule = firewalld_rich_rule(source, port);
        let added = ctx.exec_classified(
            &["firewall-cmd", "--permanent", "--add-rich-rule", &rule],
            RunOptions::default(),
            &ExitCodeClassifier::new([(FIREWALLD_ALREADY_ENABLED, "ALREADY_ENABLED")]),
        )?;
        if added.is_fatal() {
            return Ok(added);
        }

        ctx.exec(&["firewall-cmd", "--reload"])?;
        ctx.exec(&["firewall-cmd", "--list-rich-rules"])?;
        Ok(added)
    }
}

impl Step for ConfigureFirewall {
    fn name(&self) -> &'static str {
        CONFIGURE_FIREWALL
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::Guarded
    }

    fn fatal_on_failure(&self) -> bool {
        false
    }

    fn skip_reason(&self, config: &ExporterConfig) -> Option<String> {
        config
            .allow_source
            .is_none()
            .then(|| "no source address to allow-list".to_string())
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let config = ctx.config();
        let Some(source) = &config.allow_source else {
            return Ok(Outcome::Success);
        };

        match ctx.firewall_backend() {
            FirewallBackend::Ufw => Self::ufw(ctx, source, config.port),
            FirewallBackend::Firewalld => Self::firewalld(ctx, source, config.port),
            FirewallBackend::None => {
                ctx.reporter().warn(&format!(
                    "Neither ufw nor firewalld found; open TCP port {} for {source} manually",
                    config.port
                ));
                Ok(Outcome::Success)
            }
        }
    }
}
