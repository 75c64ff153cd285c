use std::env;
use std::time::Duration;

/// Error-tracking delivery settings.
///
/// With `TELEMETRY_ENDPOINT` unset, reports are written to the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(2),
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("TELEMETRY_ENDPOINT").ok().filter(|v| !v.is_empty()),
            timeout: env::var("TELEMETRY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Self::default().timeout),
        }
    }
}
