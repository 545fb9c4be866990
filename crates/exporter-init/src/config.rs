//! Config file loading and option resolution

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use exporter_provision::config::{DEFAULT_ARCH, DEFAULT_VERSION};
use exporter_provision::{AllowSource, BinarySource, ExporterConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DeployArgs;

/// Binary used in upload mode when no path is given
const DEFAULT_BINARY_PATH: &str = "./node_exporter";

/// How the exporter binary reaches the host
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMethod {
    /// Download the release archive
    #[default]
    Download,
    /// Copy a binary from a local path
    Upload,
}

/// Configuration file structure
/// Path: ~/.config/exporter-init/init.toml
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exporter: ExporterSection,
    #[serde(default)]
    pub firewall: FirewallSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExporterSection {
    pub deploy_method: Option<DeployMethod>,
    pub version: Option<String>,
    pub arch: Option<String>,
    pub binary_path: Option<PathBuf>,
    pub install_path: Option<PathBuf>,
    pub service_user: Option<String>,
    pub port: Option<u16>,
    pub release_base_url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FirewallSection {
    pub allow_ip: Option<String>,
}

/// XDG-style config path
pub fn config_path() -> PathBuf {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exporter-init")
        .join("init.toml")
}

/// Load the config file; a missing file means defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

/// Resolve the run configuration from CLI args, environment and config file
pub fn resolve(args: &DeployArgs, file: &Config) -> Result<ExporterConfig> {
    resolve_with_env(args, file, |key| env::var(key).ok())
}

/// Priority: CLI args > env vars > config file > defaults
pub fn resolve_with_env(
    args: &DeployArgs,
    file: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ExporterConfig> {
    let exporter = &file.exporter;

    let method = args
        .deploy_method
        .or(exporter.deploy_method)
        .unwrap_or_default();

    let source = match method {
        DeployMethod::Download => {
            let version = args
                .exporter_version
                .clone()
                .or_else(|| env("EXPORTER_VERSION"))
                .or_else(|| exporter.version.clone())
                .unwrap_or_else(|| DEFAULT_VERSION.to_string());
            validate_version(&version)?;
            BinarySource::Download {
                version,
                arch: args
                    .arch
                    .clone()
                    .or_else(|| exporter.arch.clone())
                    .unwrap_or_else(|| DEFAULT_ARCH.to_string()),
            }
        }
        DeployMethod::Upload => BinarySource::Upload {
            path: args
                .binary_path
                .clone()
                .or_else(|| exporter.binary_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY_PATH)),
        },
    };

    let allow_source = args
        .allow_ip
        .clone()
        .or_else(|| env("EXPORTER_ALLOW_IP"))
        .or_else(|| file.firewall.allow_ip.clone())
        .map(|ip| ip.parse::<AllowSource>())
        .transpose()?;

    let mut builder = ExporterConfig::builder()
        .source(source)
        .allow_source(allow_source);
    if let Some(path) = &exporter.install_path {
        builder = builder.install_path(path);
    }
    if let Some(user) = &exporter.service_user {
        builder = builder.service_user(user);
    }
    if let Some(port) = args.port.or(exporter.port) {
        builder = builder.port(port);
    }
    if let Some(url) = &exporter.release_base_url {
        builder = builder.release_base_url(url);
    }

    Ok(builder.build())
}

fn validate_version(version: &str) -> Result<()> {
    let semver = Regex::new(r"^\d+\.\d+\.\d+$").context("invalid version pattern")?;
    if !semver.is_match(version) {
        bail!("invalid version '{version}': expected MAJOR.MINOR.PATCH, e.g. {DEFAULT_VERSION}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with_env(&DeployArgs::default(), &Config::default(), no_env).unwrap();

        assert_eq!(
            config.source,
            BinarySource::Download {
                version: "1.9.1".into(),
                arch: "amd64".into()
            }
        );
        assert_eq!(config.port, 9100);
        assert_eq!(config.allow_source, None);
        assert_eq!(config.service_user, "node_exporter");
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file: Config = toml::from_str(
            r#"
            [exporter]
            version = "1.8.0"

            [firewall]
            allow_ip = "10.0.0.1"
            "#,
        )
        .unwrap();
        let env = |key: &str| (key == "EXPORTER_ALLOW_IP").then(|| "10.0.0.2".to_string());

        let config = resolve_with_env(&DeployArgs::default(), &file, env).unwrap();
        assert_eq!(config.allow_source.unwrap().to_string(), "10.0.0.2");
        assert!(matches!(config.source, BinarySource::Download { version, .. } if version == "1.8.0"));

        let args = DeployArgs {
            allow_ip: Some("10.0.0.5".into()),
            exporter_version: Some("1.9.0".into()),
            ..DeployArgs::default()
        };
        let config = resolve_with_env(&args, &file, env).unwrap();
        assert_eq!(config.allow_source.unwrap().to_string(), "10.0.0.5");
        assert!(matches!(config.source, BinarySource::Download { version, .. } if version == "1.9.0"));
    }

    #[test]
    fn test_upload_mode_uses_binary_path() {
        let args = DeployArgs {
            deploy_method: Some(DeployMethod::Upload),
            ..DeployArgs::default()
        };
        let config = resolve_with_env(&args, &Config::default(), no_env).unwrap();
        assert_eq!(
            config.source,
            BinarySource::Upload {
                path: PathBuf::from("./node_exporter")
            }
        );
    }

    #[test]
    fn test_file_overrides_paths_and_user() {
        let file: Config = toml::from_str(
            r#"
            [exporter]
            deploy_method = "upload"
            binary_path = "/srv/node_exporter"
            service_user = "metrics"
            port = 9200
            "#,
        )
        .unwrap();

        let config = resolve_with_env(&DeployArgs::default(), &file, no_env).unwrap();
        assert_eq!(
            config.source,
            BinarySource::Upload {
                path: PathBuf::from("/srv/node_exporter")
            }
        );
        assert_eq!(config.service_user, "metrics");
        assert_eq!(config.unit_path, PathBuf::from("/etc/systemd/system/metrics.service"));
        assert_eq!(config.port, 9200);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let args = DeployArgs {
            exporter_version: Some("latest".into()),
            ..DeployArgs::default()
        };
        assert!(resolve_with_env(&args, &Config::default(), no_env).is_err());

        let args = DeployArgs {
            allow_ip: Some("prometheus.internal".into()),
            ..DeployArgs::default()
        };
        assert!(resolve_with_env(&args, &Config::default(), no_env).is_err());
    }

    #[test]
    fn test_missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("init.toml"))).unwrap();
        assert!(config.exporter.version.is_none());
    }
}
