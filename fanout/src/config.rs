use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("At least one endpoint must be configured")]
    NoEndpoints,

    #[error("Proxy timeout must be greater than 0")]
    InvalidTimeout,

    #[error("Empty proxy path")]
    EmptyProxyPath,
}

/// Fan-out proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Optional listener serving /health and /ready
    pub admin_listener: Option<Listener>,
    /// Raw endpoint strings, resolved once at startup
    pub endpoints: Vec<String>,
    /// Per-endpoint timeout in milliseconds, covering connect, send and full body read
    pub proxy_timeout_ms: u64,
    /// Request paths that are fanned out; anything else gets an empty 200
    pub proxy_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: Listener::default(),
            admin_listener: None,
            endpoints: vec![
                "http://127.0.0.1:8126".to_string(),
                "http://127.0.0.1:9529".to_string(),
            ],
            proxy_timeout_ms: 45_000,
            proxy_paths: vec![
                "/v0.4/traces".to_string(),
                "/v0.5/traces".to_string(),
                "/profiling/v1/input".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }

    /// Validates the proxy configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }

        if self.endpoints.is_empty() {
            return Err(ValidationError::NoEndpoints);
        }

        if self.proxy_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        if self.proxy_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::EmptyProxyPath);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 2626,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
