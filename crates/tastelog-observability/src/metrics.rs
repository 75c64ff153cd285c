//! Prometheus metrics.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `http_requests_total` | method, path, status |
//! | `http_request_duration_seconds` | method, path |
//!
//! `path` is a route template such as `/api/tastings/{id}`, never a raw request
//! path, so the number of series stays bounded.
//! | `http_requests_active` | |
//! | `rate_limit_requests_total` | bucket, outcome |
//! | `auth_failures_total` | reason |
//! | `error_reports_total` | kind |

use std::time::Duration;

use anyhow::Context;
use axum::{Router, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::logging::is_observability_enabled;

/// Installs the Prometheus recorder and its upkeep task.
///
/// Returns `Ok(None)` when observability is disabled.
pub fn init_metrics() -> anyhow::Result<Option<PrometheusHandle>> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Router for the metrics listener.
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

/// Counts a request as in flight until dropped.
#[must_use = "the request stops counting as active when this is dropped"]
#[derive(Debug)]
pub struct ActiveRequest(());

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        gauge!("http_requests_active").decrement(1.0);
    }
}

pub fn track_active_request() -> ActiveRequest {
    gauge!("http_requests_active").increment(1.0);
    ActiveRequest(())
}

pub fn record_request(method: &str, route: &str, status: u16, latency: Duration) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => route.to_string()
    )
    .record(latency.as_secs_f64());
}

/// `outcome` is one of `allowed`, `limited`, `store_error`.
pub fn record_rate_limit(bucket: &str, outcome: &'static str) {
    counter!("rate_limit_requests_total", "bucket" => bucket.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn track_auth_failure(reason: &'static str) {
    counter!("auth_failures_total", "reason" => reason).increment(1);
}

pub fn track_error_report(kind: &str) {
    counter!("error_reports_total", "kind" => kind.to_string()).increment(1);
}
