//! Error-tracking sink.
//!
//! The pipeline reports failures through [`TelemetrySink::report`], which is
//! fire-and-forget: implementations must not block the request and must not fail it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Correlation data attached to every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ReportContext {
    pub fn new(request_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            request_id: request_id.into(),
            user_id,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error classification, e.g. `AuthInvalid`, `InternalError`, `Panic`.
    pub error: String,
    /// Full detail. May contain internals; never sent to clients.
    pub message: String,
    pub context: ReportContext,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>, message: impl Into<String>, context: ReportContext) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            context,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.extra.insert(key.into(), value.into());
        self
    }
}

pub trait TelemetrySink: Send + Sync + fmt::Debug {
    fn report(&self, report: ErrorReport);
}

/// Emits reports as structured `error!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn report(&self, report: ErrorReport) {
        let extra = serde_json::to_string(&report.context.extra).unwrap_or_default();
        error!(
            telemetry.error = %report.error,
            request_id = %report.context.request_id,
            user_id = report.context.user_id.as_deref().unwrap_or("-"),
            extra = %extra,
            "{}",
            report.message
        );
    }
}

/// Posts reports as JSON to an error-tracking endpoint on a background task.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl TelemetrySink for HttpSink {
    fn report(&self, report: ErrorReport) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(telemetry.error = %report.error, "No runtime available, falling back to log sink");
            TracingSink.report(report);
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        runtime.spawn(async move {
            let result = client
                .post(&endpoint)
                .json(&report)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(e) = result {
                warn!(error = %e, "Failed to deliver error report");
                TracingSink.report(report);
            }
        });
    }
}

/// Keeps reports in memory. Useful for local development and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<ErrorReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn report(&self, report: ErrorReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.report(ErrorReport::new("A", "first", ReportContext::new("req-1", None)));
        sink.report(ErrorReport::new(
            "B",
            "second",
            ReportContext::new("req-2", Some("user-9".into())),
        ));

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].error, "A");
        assert_eq!(reports[1].context.user_id.as_deref(), Some("user-9"));
    }

    #[test]
    fn test_report_context_flattens_extra() {
        let report = ErrorReport::new("AuthInvalid", "bad signature", ReportContext::new("req-3", None))
            .with_extra("path", "/api/tastings");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["context"]["request_id"], "req-3");
        assert_eq!(value["context"]["path"], "/api/tastings");
        assert!(value["context"].get("user_id").is_none());
    }
}
