//! Request dispatch.
//!
//! [`dispatch`] is the outermost application layer. For every request it:
//!
//! 1. opens a correlation context with a fresh request id
//! 2. logs the request and measures it
//! 3. reports internal failures (errors and panics) to the telemetry sink, once
//! 4. stamps `X-Request-Id` on the response and records request metrics
//!
//! [`dispatch`] runs before routing, so it cannot see [`MatchedPath`] on the request.
//! [`stamp_matched_path`] runs inside the router and copies it onto the response;
//! metrics are labelled by that route template, or [`UNMATCHED_ROUTE`].
//!
//! [`MethodMap`] and [`create_handler`] turn per-method pipelines into a single
//! route that answers 405 for any other method.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use tastelog_core::{AppError, ErrorCode, ErrorReport, InternalFailure, TelemetrySink};
use tastelog_observability::{record_request, track_active_request, track_error_report};
use tracing::{Instrument, error, info, info_span, warn};

use crate::middleware::context::{RequestContext, new_request_id, report_context, with_context};
use crate::state::AppState;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Metrics label for requests that matched no route.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

#[derive(Debug, Clone)]
pub struct Dispatcher {
    telemetry: Arc<dyn TelemetrySink>,
    slow_threshold: Duration,
}

impl Dispatcher {
    pub fn new(telemetry: Arc<dyn TelemetrySink>, slow_threshold: Duration) -> Self {
        Self {
            telemetry,
            slow_threshold,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.telemetry.clone(),
            state.server_config.slow_request_threshold,
        )
    }

    fn report(&self, failure: InternalFailure, method: &Method, path: &str) {
        track_error_report(&failure.kind);
        self.telemetry.report(
            ErrorReport::new(failure.kind, failure.detail, report_context())
                .with_extra("method", method.as_str())
                .with_extra("path", path),
        );
    }
}

pub async fn dispatch(
    State(dispatcher): State<Arc<Dispatcher>>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = new_request_id();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        user_id = tracing::field::Empty,
    );

    let ctx = RequestContext::new(request_id.clone());

    with_context(
        ctx,
        async move {
            let _active = track_active_request();
            let start = Instant::now();
            info!("Incoming request");

            let mut response = next.run(req).await;
            let latency = start.elapsed();
            let status = response.status();

            if let Some(failure) = response.extensions_mut().remove::<InternalFailure>() {
                dispatcher.report(failure, &method, &path);
            }

            let slow = latency > dispatcher.slow_threshold;
            let latency_ms = latency.as_millis() as u64;
            match status.as_u16() {
                500..=599 => error!(status = status.as_u16(), latency_ms, slow, "Server error"),
                400..=499 => warn!(status = status.as_u16(), latency_ms, slow, "Client error"),
                _ if slow => warn!(status = status.as_u16(), latency_ms, slow, "Slow request"),
                _ => info!(status = status.as_u16(), latency_ms, slow, "Request completed"),
            }

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert(X_REQUEST_ID, value);
            }

            record_request(method.as_str(), route_label(&response), status.as_u16(), latency);

            response
        }
        .instrument(span),
    )
    .await
}

/// Copies the route template the router matched onto the response.
pub async fn stamp_matched_path(req: Request, next: Next) -> Response {
    let matched = req.extensions().get::<MatchedPath>().cloned();
    let mut response = next.run(req).await;
    if let Some(matched) = matched {
        response.extensions_mut().insert(matched);
    }
    response
}

fn route_label(response: &Response) -> &str {
    response
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
}

/// Turns a caught panic into the generic 500 envelope. The payload travels to
/// [`dispatch`] for reporting.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "panic with a non-string payload".to_string()
    };

    let mut response = AppError::from_code(ErrorCode::InternalError).into_response();
    response
        .extensions_mut()
        .insert(InternalFailure::new("Panic", detail));
    response
}

pub async fn not_found() -> AppError {
    AppError::not_found()
}

pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

/// Per-method routes for one path.
#[derive(Debug, Default)]
pub struct MethodMap {
    routes: Vec<MethodRouter<AppState>>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the routes for one or more methods.
    ///
    /// # Panics
    ///
    /// [`create_handler`] panics if two entries serve the same method.
    #[must_use]
    pub fn route(mut self, route: MethodRouter<AppState>) -> Self {
        self.routes.push(route);
        self
    }
}

/// Merges a [`MethodMap`] into one route answering 405 for unmapped methods.
pub fn create_handler(map: MethodMap) -> MethodRouter<AppState> {
    map.routes
        .into_iter()
        .fold(MethodRouter::new(), MethodRouter::merge)
        .fallback(method_not_allowed)
}
