//! Configuration types for node_exporter provisioning

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Release pinned when the operator does not choose one
pub const DEFAULT_VERSION: &str = "1.9.1";
pub const DEFAULT_ARCH: &str = "amd64";
pub const DEFAULT_INSTALL_PATH: &str = "/usr/local/bin/node_exporter";
pub const DEFAULT_SERVICE_USER: &str = "node_exporter";
pub const DEFAULT_PORT: u16 = 9100;
pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://github.com/prometheus/node_exporter/releases/download";

/// Where the exporter binary comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySource {
    /// Fetch the release archive and extract the binary
    Download { version: String, arch: String },
    /// Copy an existing binary from the local filesystem
    Upload { path: PathBuf },
}

impl Default for BinarySource {
    fn default() -> Self {
        Self::Download {
            version: DEFAULT_VERSION.into(),
            arch: DEFAULT_ARCH.into(),
        }
    }
}

/// Source address allowed to reach the exporter port
///
/// Either a single address or a CIDR network (`10.0.0.0/24`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowSource {
    addr: IpAddr,
    prefix: Option<u8>,
}

impl AllowSource {
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Rich-rule address family
    pub fn family(&self) -> &'static str {
        match self.addr {
            IpAddr::V4(_) => "ipv4",
            IpAddr::V6(_) => "ipv6",
        }
    }
}

impl fmt::Display for AllowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}/{prefix}", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

/// Invalid `--allow-ip` value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid source address '{0}': expected an IP address or CIDR network")]
pub struct InvalidAllowSource(String);

impl FromStr for AllowSource {
    type Err = InvalidAllowSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAllowSource(s.to_string());
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix.parse::<u8>().map_err(|_| invalid())?)),
            None => (s.trim(), None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix.is_some_and(|p| p > max) {
            return Err(invalid());
        }
        Ok(Self { addr, prefix })
    }
}

/// Immutable configuration for one provisioning run
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Binary source
    pub source: BinarySource,
    /// Installed executable path
    pub install_path: PathBuf,
    /// Dedicated service account (also the service and group name)
    pub service_user: String,
    /// systemd unit file path
    pub unit_path: PathBuf,
    /// Port the exporter listens on
    pub port: u16,
    /// Release download base URL
    pub release_base_url: String,
    /// Source address to allow-list in the host firewall
    pub allow_source: Option<AllowSource>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            source: BinarySource::default(),
            install_path: DEFAULT_INSTALL_PATH.into(),
            service_user: DEFAULT_SERVICE_USER.into(),
            unit_path: unit_path_for(DEFAULT_SERVICE_USER),
            port: DEFAULT_PORT,
            release_base_url: DEFAULT_RELEASE_BASE_URL.into(),
            allow_source: None,
        }
    }
}

fn unit_path_for(service: &str) -> PathBuf {
    Path::new("/etc/systemd/system").join(format!("{service}.service"))
}

impl ExporterConfig {
    /// Create a new config builder
    pub fn builder() -> ExporterConfigBuilder {
        ExporterConfigBuilder::default()
    }

    /// systemd service name
    pub fn service_name(&self) -> &str {
        &self.service_user
    }

    /// Release archive file name, e.g. `node_exporter-1.9.1.linux-amd64.tar.gz`
    pub fn archive_name(version: &str, arch: &str) -> String {
        format!("{}.tar.gz", Self::archive_dir(version, arch))
    }

    /// Top-level directory inside the release archive
    pub fn archive_dir(version: &str, arch: &str) -> String {
        format!("node_exporter-{version}.linux-{arch}")
    }

    /// Release archive URL
    pub fn download_url(&self, version: &str, arch: &str) -> String {
        format!(
            "{}/v{version}/{}",
            self.release_base_url.trim_end_matches('/'),
            Self::archive_name(version, arch)
        )
    }

    /// Local metrics endpoint
    pub fn metrics_url(&self) -> String {
        format!("http://localhost:{}/metrics", self.port)
    }
}

/// Builder for `ExporterConfig`
#[derive(Debug, Clone, Default)]
pub struct ExporterConfigBuilder {
    config: ExporterConfig,
    unit_path_set: bool,
}

impl ExporterConfigBuilder {
    /// Set the binary source
    pub fn source(mut self, source: BinarySource) -> Self {
        self.config.source = source;
        self
    }

    /// Set the installed binary path
    pub fn install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.install_path = path.into();
        self
    }

    /// Set the service user; the unit path follows unless set explicitly
    pub fn service_user(mut self, user: impl Into<String>) -> Self {
        self.config.service_user = user.into();
        self
    }

    /// Set the unit file path
    pub fn unit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.unit_path = path.into();
        self.unit_path_set = true;
        self
    }

    /// Set the exporter port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the release download base URL
    pub fn release_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.release_base_url = url.into();
        self
    }

    /// Allow-list a source address in the firewall
    pub fn allow_source(mut self, source: Option<AllowSource>) -> Self {
        self.config.allow_source = source;
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ExporterConfig {
        if !self.unit_path_set {
            self.config.unit_path = unit_path_for(&self.config.service_user);
        }
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_pattern() {
        let config = ExporterConfig::default();
        assert_eq!(
            config.download_url("1.9.1", "arm64"),
            "https://github.com/prometheus/node_exporter/releases/download/v1.9.1/node_exporter-1.9.1.linux-arm64.tar.gz"
        );
    }

    #[test]
    fn test_unit_path_follows_service_user() {
        let config = ExporterConfig::builder().service_user("metrics").build();
        assert_eq!(
            config.unit_path,
            PathBuf::from("/etc/systemd/system/metrics.service")
        );

        let config = ExporterConfig::builder()
            .unit_path("/tmp/x.service")
            .service_user("metrics")
            .build();
        assert_eq!(config.unit_path, PathBuf::from("/tmp/x.service"));
    }

    #[test]
    fn test_allow_source_parsing() {
        let single: AllowSource = "10.0.0.5".parse().unwrap();
        assert_eq!(single.to_string(), "10.0.0.5");
        assert_eq!(single.family(), "ipv4");

        let net: AllowSource = "fd00::/64".parse().unwrap();
        assert_eq!(net.to_string(), "fd00::/64");
        assert_eq!(net.family(), "ipv6");

        assert!("10.0.0.0/33".parse::<AllowSource>().is_err());
        assert!("prometheus.local".parse::<AllowSource>().is_err());
        assert!("10.0.0.5/abc".parse::<AllowSource>().is_err());
    }
}
