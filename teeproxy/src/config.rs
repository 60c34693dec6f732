use fanout::config::{Config as ProxyConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Replaces the configured endpoints with a comma separated list, if it
    /// holds anything besides whitespace.
    pub fn override_endpoints(&mut self, list: &str) {
        let endpoints: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(String::from)
            .collect();

        if !endpoints.is_empty() {
            self.proxy.endpoints = endpoints;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(self.proxy.validate()?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            logging:
                level: debug
                sentry_dsn: https://key@sentry.example.com/1
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            proxy:
                listener:
                    host: 127.0.0.1
                    port: 2626
                endpoints:
                    - 127.0.0.1:8126
                    - http://127.0.0.1:9529/
                proxy_timeout_ms: 5000
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");
        config.validate().expect("valid config");

        let logging = config.common.logging.expect("logging config");
        assert_eq!(logging.level, "debug");
        assert!(logging.sentry_dsn.is_some());
        assert_eq!(config.common.metrics.unwrap().statsd_port, 8125);
        assert_eq!(config.proxy.endpoints.len(), 2);
        assert_eq!(config.proxy.proxy_timeout(), Duration::from_secs(5));
        // Not set in the file
        assert_eq!(config.proxy.proxy_paths.len(), 3);
    }

    #[test]
    fn proxy_section_is_optional() {
        let tmp = write_tmp_file("logging: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert_eq!(config.proxy, ProxyConfig::default());
        assert_eq!(config.common.logging.unwrap().level, "info");
    }

    #[test]
    fn load_errors() {
        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/teeproxy.yaml")),
            Err(ConfigError::LoadError(_))
        ));

        let tmp = write_tmp_file("proxy: {listener: {host: 0.0.0.0, port: nope}}\n");
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));

        let tmp = write_tmp_file("proxy: {endpoints: []}\n");
        let config = Config::from_file(tmp.path()).expect("load config");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(ValidationError::NoEndpoints))
        ));
    }

    #[test]
    fn endpoint_override() {
        let mut config = Config::default();

        config.override_endpoints("  ");
        assert_eq!(config.proxy.endpoints, ProxyConfig::default().endpoints);

        config.override_endpoints(" 10.0.0.1:8126, ,https://collector.internal ");
        assert_eq!(
            config.proxy.endpoints,
            vec![
                "10.0.0.1:8126".to_string(),
                "https://collector.internal".to_string()
            ]
        );
    }
}
