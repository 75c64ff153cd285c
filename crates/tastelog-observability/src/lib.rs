//! Tastelog Observability
//!
//! - Structured logging to console and rolling files
//! - Distributed tracing via OpenTelemetry, when an OTLP endpoint is configured
//! - Metrics via Prometheus
//!
//! Compiled in with the `observability` feature (default). At runtime,
//! `OBSERVABILITY_ENABLED=false` switches to console logging only and turns
//! metrics off.
//!
//! # Examples
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     tastelog_observability::init_logging()?;
//!     // ... application code ...
//!     tastelog_observability::shutdown_tracer().await;
//!     Ok(())
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

pub use basic_logging::init_basic_console_logging;

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, is_observability_enabled, shutdown_tracer};
#[cfg(feature = "observability")]
pub use crate::metrics::{
    ActiveRequest, init_metrics, metrics_app, record_rate_limit, record_request,
    track_active_request, track_auth_failure, track_error_report,
};

/// Full tracing when observability is enabled, console logging otherwise.
pub fn init_logging() -> anyhow::Result<()> {
    if is_observability_enabled() {
        init_tracing()
    } else {
        init_basic_console_logging();
        Ok(())
    }
}

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use std::time::Duration;

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub fn init_tracing() -> anyhow::Result<()> {
        super::init_basic_console_logging();
        Ok(())
    }

    pub async fn shutdown_tracer() {}

    pub fn init_metrics() -> anyhow::Result<Option<()>> {
        Ok(None)
    }

    #[derive(Debug)]
    pub struct ActiveRequest;

    pub fn track_active_request() -> ActiveRequest {
        ActiveRequest
    }

    pub fn record_request(_method: &str, _route: &str, _status: u16, _latency: Duration) {}
    pub fn record_rate_limit(_bucket: &str, _outcome: &'static str) {}
    pub fn track_auth_failure(_reason: &'static str) {}
    pub fn track_error_report(_kind: &str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
