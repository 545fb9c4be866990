//! Exporter Init - Prometheus node_exporter provisioning
//!
//! Installs node_exporter on the local host as a systemd service:
//! - Creates a dedicated system user
//! - Installs the binary (downloaded release or local copy)
//! - Installs, starts and enables the service unit
//! - Optionally allow-lists a scraper address in ufw or firewalld

mod config;
mod reporter;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use console::{Emoji, style};
use exporter_provision::{
    BinarySource, CommandRunner, Context, ExporterConfig, Manifest, Outcome, RunOptions,
    RunResult, StepStatus, SystemRunner, render,
};
use tracing_subscriber::EnvFilter;

use config::{DeployMethod, config_path, load_config};
use reporter::ConsoleReporter;

static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

#[derive(Parser, Debug)]
#[command(
    name = "exporter-init",
    version,
    about = "Install Prometheus node_exporter as a systemd service",
    after_help = "Deployment flags belong to the deploy subcommand:\n  \
                  exporter-init deploy --version 1.9.1 --allow-ip 10.0.0.5"
)]
struct Args {
    /// Subcommand (defaults to deploy if not specified)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (global)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show config file path and exit
    #[arg(long)]
    show_config: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision node_exporter on this host (default)
    Deploy(DeployArgs),

    /// Show what a deploy would install
    Show(ShowArgs),
}

#[derive(Parser, Debug, Default)]
pub(crate) struct DeployArgs {
    /// How the binary reaches the host
    #[arg(long, value_enum)]
    pub deploy_method: Option<DeployMethod>,

    /// Release version to download (e.g., 1.9.1)
    #[arg(long = "version", value_name = "X.Y.Z")]
    pub exporter_version: Option<String>,

    /// Release architecture (e.g., amd64, arm64)
    #[arg(long)]
    pub arch: Option<String>,

    /// Local binary for --deploy-method upload
    #[arg(long)]
    pub binary_path: Option<PathBuf>,

    /// Source address allowed to scrape the exporter (IP or CIDR)
    #[arg(long)]
    pub allow_ip: Option<String>,

    /// Exporter listen port
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// What to show
    #[arg(value_enum, default_value = "plan")]
    target: ShowTarget,

    #[command(flatten)]
    deploy: DeployArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShowTarget {
    /// Rendered systemd unit
    Unit,
    /// Step sequence
    Plan,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Show config path and exit
    if args.show_config {
        let path = args.config.clone().unwrap_or_else(config_path);
        println!("{FOLDER} Config: {}", path.display());
        if path.exists() {
            println!("  {CHECK} exists");
        } else {
            println!("  {} not found (will use defaults)", style("!").yellow());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let file_config = load_config(args.config.as_deref())?;

    match args.command {
        Some(Commands::Deploy(deploy_args)) => run_deploy(&deploy_args, &file_config),
        Some(Commands::Show(show_args)) => run_show(&show_args, &file_config),
        None => run_deploy(&DeployArgs::default(), &file_config),
    }
}

/// Run provisioning on this host
fn run_deploy(args: &DeployArgs, file_config: &config::Config) -> Result<ExitCode> {
    let config = config::resolve(args, file_config)?;
    tracing::debug!(?config, "resolved configuration");

    print_banner();
    print_config_table(&config);

    let runner = SystemRunner::new();
    ensure_root(&runner)?;

    let reporter = ConsoleReporter::new();
    let manifest = Manifest::node_exporter(&config);
    println!(
        "\n{ROCKET} Provisioning ({} steps)...\n",
        manifest.steps.len()
    );

    let mut ctx = Context::new(&config, &runner, &reporter);
    let result = manifest.run_all(&mut ctx);
    reporter.finish();

    print_summary(&result);

    if let Some(step) = result.failed_at {
        eprintln!(
            "\n{CROSS} Provisioning failed at {}: {}",
            style(step).bold(),
            result.failure.as_deref().unwrap_or("unknown error")
        );
        return Ok(ExitCode::FAILURE);
    }

    print_success(&config, &result);
    Ok(ExitCode::SUCCESS)
}

/// Refuse to run without root, before any step touches the host
fn ensure_root(runner: &dyn CommandRunner) -> Result<()> {
    let output = runner
        .run(&["id", "-u"], &RunOptions::default())
        .context("Failed to determine effective user id")?;
    if output.stdout.trim() != "0" {
        bail!("exporter-init must run as root (try: sudo exporter-init ...)");
    }
    Ok(())
}

fn run_show(args: &ShowArgs, file_config: &config::Config) -> Result<ExitCode> {
    let config = config::resolve(&args.deploy, file_config)?;

    match args.target {
        ShowTarget::Unit => {
            let unit = render::service_unit(&config).context("Failed to render service unit")?;
            println!("# {}", config.unit_path.display());
            print!("{unit}");
        }
        ShowTarget::Plan => print_plan(&config),
    }

    Ok(ExitCode::SUCCESS)
}

fn print_plan(config: &ExporterConfig) {
    let manifest = Manifest::node_exporter(config);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("#").fg(Color::Cyan),
        Cell::new("Step").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Idempotency").fg(Color::Cyan),
        Cell::new("On failure").fg(Color::Cyan),
        Cell::new("Runs").fg(Color::Cyan),
    ]);

    for (i, step) in manifest.steps.iter().enumerate() {
        let on_failure = if step.fatal_on_failure() {
            Cell::new("abort").fg(Color::Red)
        } else {
            Cell::new("continue").fg(Color::Yellow)
        };
        let runs = match step.skip_reason(config) {
            Some(reason) => Cell::new(format!("no ({reason})")).fg(Color::DarkGrey),
            None => Cell::new("yes").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(step.name()),
            Cell::new(step.description()),
            Cell::new(step.idempotency()),
            on_failure,
            runs,
        ]);
    }

    println!("{table}");
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════╗")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("║      NODE EXPORTER PROVISIONING       ║")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════╝")
            .cyan()
            .bold()
    );
}

fn print_config_table(config: &ExporterConfig) {
    println!("\n{} Configuration\n", style("▸").blue().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    match &config.source {
        BinarySource::Download { version, arch } => {
            table.add_row(vec!["Method".to_string(), "download".to_string()]);
            table.add_row(vec!["Release".to_string(), format!("v{version} ({arch})")]);
        }
        BinarySource::Upload { path } => {
            table.add_row(vec!["Method".to_string(), "upload".to_string()]);
            table.add_row(vec!["Binary".to_string(), path.display().to_string()]);
        }
    }
    table.add_row(vec![
        "Install path".to_string(),
        config.install_path.display().to_string(),
    ]);
    table.add_row(vec!["User".to_string(), config.service_user.clone()]);
    table.add_row(vec![
        "Unit".to_string(),
        config.unit_path.display().to_string(),
    ]);
    table.add_row(vec!["Port".to_string(), config.port.to_string()]);
    table.add_row(vec![
        "Allow from".to_string(),
        config
            .allow_source
            .map_or_else(|| "(firewall unchanged)".to_string(), |s| s.to_string()),
    ]);

    println!("{table}");
}

fn print_summary(result: &RunResult) {
    println!("\n{} Summary\n", style("▸").blue().bold());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Step").fg(Color::Cyan),
        Cell::new("Result").fg(Color::Cyan),
        Cell::new("Detail").fg(Color::Cyan),
    ]);

    for report in &result.reports {
        let (status, detail) = match &report.status {
            StepStatus::Ran(Outcome::Success) => (Cell::new("ok").fg(Color::Green), String::new()),
            StepStatus::Ran(Outcome::ToleratedFailure(reason)) => {
                (Cell::new("ok").fg(Color::Green), reason.clone())
            }
            StepStatus::Ran(Outcome::FatalFailure(reason)) if report.fatal_on_failure => {
                (Cell::new("failed").fg(Color::Red), reason.clone())
            }
            StepStatus::Ran(Outcome::FatalFailure(reason)) => {
                (Cell::new("warning").fg(Color::Yellow), reason.clone())
            }
            StepStatus::Skipped(reason) => (Cell::new("skipped").fg(Color::DarkGrey), reason.clone()),
            StepStatus::Blocked(reason) => (Cell::new("blocked").fg(Color::Red), reason.clone()),
        };
        table.add_row(vec![Cell::new(report.name), status, Cell::new(detail)]);
    }

    println!("{table}");
}

fn print_success(config: &ExporterConfig, result: &RunResult) {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════╗")
            .green()
            .bold()
    );
    println!(
        "{}",
        style("║          EXPORTER INSTALLED!          ║")
            .green()
            .bold()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════╝")
            .green()
            .bold()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.add_row(vec![
        Cell::new("Metrics").fg(Color::Cyan),
        Cell::new(config.metrics_url()),
    ]);
    table.add_row(vec![
        Cell::new("Logs").fg(Color::Cyan),
        Cell::new(format!("journalctl -u {} -f", config.service_name())),
    ]);
    println!("{table}");
    println!();

    if result.soft_failures.is_empty() {
        println!("{SPARKLE} Deployment complete!");
    } else {
        println!(
            "{} Deployment complete with {} warning(s), see summary above",
            style("!").yellow(),
            result.soft_failures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_flag_belongs_to_deploy() {
        let args = Args::try_parse_from([
            "exporter-init",
            "deploy",
            "--version",
            "1.8.2",
            "--allow-ip",
            "10.0.0.5",
        ])
        .unwrap();

        let Some(Commands::Deploy(deploy)) = args.command else {
            panic!("expected deploy subcommand");
        };
        assert_eq!(deploy.exporter_version.as_deref(), Some("1.8.2"));
        assert_eq!(deploy.allow_ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_deploy_method_values() {
        let args =
            Args::try_parse_from(["exporter-init", "deploy", "--deploy-method", "upload"]).unwrap();
        let Some(Commands::Deploy(deploy)) = args.command else {
            panic!("expected deploy subcommand");
        };
        assert_eq!(deploy.deploy_method, Some(DeployMethod::Upload));

        assert!(
            Args::try_parse_from(["exporter-init", "deploy", "--deploy-method", "scp"]).is_err()
        );
    }

    #[test]
    fn test_help_points_deploy_flags_to_subcommand() {
        use clap::CommandFactory;

        let help = Args::command().render_long_help().to_string();
        assert!(help.contains("exporter-init deploy --version 1.9.1 --allow-ip 10.0.0.5"));

        // Deploy flags are only accepted after the subcommand
        assert!(Args::try_parse_from(["exporter-init", "--allow-ip", "10.0.0.5"]).is_err());
    }

    #[test]
    fn test_no_subcommand_defaults_to_deploy() {
        let args = Args::try_parse_from(["exporter-init"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_show_unit_accepts_deploy_flags() {
        let args =
            Args::try_parse_from(["exporter-init", "show", "unit", "--port", "9200"]).unwrap();
        let Some(Commands::Show(show)) = args.command else {
            panic!("expected show subcommand");
        };
        assert!(matches!(show.target, ShowTarget::Unit));
        assert_eq!(show.deploy.port, Some(9200));
    }
}
