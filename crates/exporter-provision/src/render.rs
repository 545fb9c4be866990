//! Service unit rendering

use tera::{Context, Tera};

use crate::config::ExporterConfig;

const UNIT_TEMPLATE: &str = include_str!("../templates/node_exporter.service.tera");

/// Render the systemd unit for `config`
pub fn service_unit(config: &ExporterConfig) -> Result<String, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("service-unit", UNIT_TEMPLATE)?;

    let mut context = Context::new();
    context.insert("user", &config.service_user);
    context.insert("exec_path", &config.install_path.display().to_string());
    context.insert("port", &config.port);

    tera.render("service-unit", &context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_is_parameterized_by_path_and_user() {
        let config = ExporterConfig::builder()
            .install_path("/opt/bin/node_exporter")
            .service_user("metrics")
            .build();

        let unit = service_unit(&config).unwrap();

        assert!(unit.starts_with("[Unit]"));
        assert!(unit.contains("User=metrics\n"));
        assert!(unit.contains("Group=metrics\n"));
        assert!(unit.contains("ExecStart=/opt/bin/node_exporter --web.listen-address=:9100\n"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn test_unit_render_is_deterministic() {
        let config = ExporterConfig::default();
        assert_eq!(service_unit(&config).unwrap(), service_unit(&config).unwrap());
    }
}
