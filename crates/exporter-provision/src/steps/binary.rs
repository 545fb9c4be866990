//! Exporter binary installation

use std::fs;
use std::path::Path;

use super::file::place_file;
use super::{INSTALL_BINARY, Idempotency, Step};
use crate::classify::Outcome;
use crate::config::{BinarySource, ExporterConfig};
use crate::context::Context;
use crate::error::ProvisionError;

/// Install the exporter executable from a release archive or a local file
#[derive(Debug, Clone)]
pub struct InstallBinary {
    description: String,
}

impl InstallBinary {
    pub fn new(config: &ExporterConfig) -> Self {
        let description = match &config.source {
            BinarySource::Download { version, .. } => {
                format!("Install node_exporter {version} (download)")
            }
            BinarySource::Upload { path } => {
                format!("Install node_exporter from {}", path.display())
            }
        };
        Self { description }
    }

    /// Fetch and unpack the release archive, returning the binary's bytes
    fn download(ctx: &Context<'_>, version: &str, arch: &str) -> Result<Vec<u8>, ProvisionError> {
        let config = ctx.config();
        let workdir = tempfile::Builder::new()
            .prefix("node-exporter-")
            .tempdir()
            .map_err(|e| ProvisionError::io(std::env::temp_dir(), e))?;

        let url = config.download_url(version, arch);
        let archive = workdir
            .path()
            .join(ExporterConfig::archive_name(version, arch));
        let archive_arg = archive.to_string_lossy();
        let workdir_arg = workdir.path().to_string_lossy();

        ctx.reporter().info(&format!("Downloading {url}"));
        ctx.exec(&["curl", "-fsSL", "-o", &archive_arg, &url])?;
        ctx.exec(&["tar", "-xzf", &archive_arg, "-C", &workdir_arg])?;

        let extracted = workdir
            .path()
            .join(ExporterConfig::archive_dir(version, arch))
            .join("node_exporter");
        fs::read(&extracted).map_err(|e| ProvisionError::io(extracted, e))
    }

    /// Read a local binary, failing before any privileged change if it is absent
    fn upload(ctx: &Context<'_>, path: &Path) -> Result<Vec<u8>, ProvisionError> {
        if !path.exists() {
            return Err(ProvisionError::SourceNotFound(path.to_path_buf()));
        }
        ctx.reporter()
            .info(&format!("Copying {}", path.display()));
        fs::read(path).map_err(|e| ProvisionError::io(path, e))
    }
}

impl Step for InstallBinary {
    fn name(&self) -> &'static str {
        INSTALL_BINARY
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn idempotency(&self) -> Idempotency {
        Idempotency::Overwrite
    }

    fn requires(&self) -> &'static [&'static str] {
        &[super::ENSURE_USER]
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<Outcome, ProvisionError> {
        let config = ctx.config();
        let binary = match &config.source {
            BinarySource::Download { version, arch } => Self::download(ctx, version, arch)?,
            BinarySource::Upload { path } => Self::upload(ctx, path)?,
        };

        if place_file(&config.install_path, &binary, 0o755)? {
            ctx.reporter().info(&format!(
                "Installed binary to {}",
                config.install_path.display()
            ));
            ctx.mark_changed();
        } else {
            ctx.reporter()
                .info("Installed binary is already up to date");
        }
        Ok(Outcome::Success)
    }
}
