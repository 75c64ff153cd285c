//! Server and request-pipeline settings.
//!
//! - `BIND_ADDRESS`: listen address (default: `0.0.0.0:3000`)
//! - `DEPLOYMENT_MODE`: `single` or `multi` (default: `single`)
//! - `SLOW_REQUEST_THRESHOLD_MS`: completion logs flag slower requests (default: 1000)
//! - `MAX_BODY_BYTES`: largest JSON body the validation guard reads (default: 65536)

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Whether this process is expected to be the only instance serving traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    #[default]
    Single,
    Multi,
}

impl DeploymentMode {
    pub fn is_multi_instance(self) -> bool {
        matches!(self, Self::Multi)
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "standalone" => Ok(Self::Single),
            "multi" | "multi-instance" | "cluster" => Ok(Self::Multi),
            other => Err(format!("unknown deployment mode: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub deployment_mode: DeploymentMode,
    pub slow_request_threshold: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            deployment_mode: DeploymentMode::Single,
            slow_request_threshold: Duration::from_millis(1000),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            deployment_mode: env::var("DEPLOYMENT_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.deployment_mode),
            slow_request_threshold: env::var("SLOW_REQUEST_THRESHOLD_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_request_threshold),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deployment_mode() {
        assert_eq!("multi".parse::<DeploymentMode>(), Ok(DeploymentMode::Multi));
        assert_eq!(" Single ".parse::<DeploymentMode>(), Ok(DeploymentMode::Single));
        assert!("both".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.deployment_mode, DeploymentMode::Single);
        assert_eq!(config.slow_request_threshold, Duration::from_secs(1));
        assert_eq!(config.max_body_bytes, 65536);
    }
}
