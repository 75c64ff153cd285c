//! Fixed-window rate limiting.
//!
//! Every guarded response carries the caller's budget for the bucket:
//!
//! - `X-RateLimit-Limit`: requests allowed per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: seconds until the window ends
//!
//! Rejected requests also get `Retry-After`.
//!
//! A guard counts per client IP and runs before authentication. A guard built with
//! [`RateLimitGuard::per_user`] runs right after authentication and counts per
//! verified user instead.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tastelog_config::{FailureMode, RateLimitPolicy};
use tastelog_core::{AppError, ErrorReport, TelemetrySink};
use tastelog_observability::record_rate_limit;
use tastelog_ratelimit::{Identity, Increment, RateLimitStore, StoreError, rate_limit_key};
use tracing::{debug, warn};

use crate::middleware::context::{current_user_id, report_context};
use crate::middleware::pipeline::{Guard, Stage};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Buckets this request has already been counted against.
#[derive(Debug, Clone, Default)]
struct ChargedBuckets(Vec<String>);

#[derive(Debug, Clone)]
pub struct RateLimitGuard {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    telemetry: Arc<dyn TelemetrySink>,
    key_prefix: String,
    per_user: bool,
}

impl RateLimitGuard {
    pub fn new(
        policy: RateLimitPolicy,
        store: Arc<dyn RateLimitStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            policy,
            store,
            telemetry,
            key_prefix: "tastelog".to_string(),
            per_user: false,
        }
    }

    /// Counts per authenticated user. Requests without a user fall back to the IP.
    #[must_use]
    pub fn per_user(mut self) -> Self {
        self.per_user = true;
        self
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    fn identity(&self, req: &Request) -> Identity {
        match current_user_id().filter(|_| self.per_user) {
            Some(user_id) => Identity::User(user_id),
            None => Identity::Ip(client_ip(req)),
        }
    }

    fn store_failure(&self, error: StoreError) -> Option<Response> {
        let bucket = self.policy.name.as_ref();
        record_rate_limit(bucket, "store_error");

        match self.policy.on_store_failure {
            FailureMode::Open => {
                warn!(
                    bucket,
                    backend = self.store.backend(),
                    error = %error,
                    "Rate limit store failed, allowing request"
                );
                None
            }
            FailureMode::Closed => {
                self.telemetry.report(
                    ErrorReport::new("RateLimitStoreUnavailable", error.to_string(), report_context())
                        .with_extra("bucket", bucket)
                        .with_extra("backend", self.store.backend()),
                );
                Some(
                    AppError::service_unavailable("Rate limiting is temporarily unavailable")
                        .into_response(),
                )
            }
        }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    fn stage(&self) -> Stage {
        if self.per_user {
            Stage::UserRateLimit
        } else {
            Stage::RateLimit
        }
    }

    async fn handle(&self, mut req: Request, next: Next) -> Response {
        let bucket = self.policy.name.to_string();

        let charged = req.extensions_mut().get_or_insert_default::<ChargedBuckets>();
        if charged.0.contains(&bucket) {
            return next.run(req).await;
        }
        charged.0.push(bucket.clone());

        let key = rate_limit_key(&self.key_prefix, &bucket, &self.identity(&req));

        let increment = match self.store.increment(&key, self.policy.window).await {
            Ok(increment) => increment,
            Err(e) => {
                if let Some(response) = self.store_failure(e) {
                    return response;
                }
                let mut response = next.run(req).await;
                let full = Increment {
                    count: 0,
                    reset: self.policy.window,
                };
                set_limit_headers(response.headers_mut(), &self.policy, &full);
                return response;
            }
        };

        if increment.count > self.policy.max_requests {
            record_rate_limit(&bucket, "limited");
            debug!(bucket = %bucket, count = increment.count, "Rate limit exceeded");

            let mut response = AppError::rate_limited().into_response();
            let headers = response.headers_mut();
            set_limit_headers(headers, &self.policy, &increment);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(increment.reset)));
            return response;
        }

        record_rate_limit(&bucket, "allowed");
        let mut response = next.run(req).await;
        set_limit_headers(response.headers_mut(), &self.policy, &increment);
        response
    }
}

fn set_limit_headers(headers: &mut HeaderMap, policy: &RateLimitPolicy, increment: &Increment) {
    let remaining = policy.max_requests.saturating_sub(increment.count);
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(policy.max_requests));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(ceil_secs(increment.reset)));
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

/// Whole seconds until the window ends, never less than one.
fn retry_after_secs(reset: Duration) -> u64 {
    ceil_secs(reset).max(1)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer
/// address, else `unknown`.
pub fn client_ip(req: &Request) -> String {
    let headers = req.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let req = request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&req), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let req = request(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&req), "198.51.100.2");
    }

    #[test]
    fn test_client_ip_uses_peer_address() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 5], 4711))));
        assert_eq!(client_ip(&req), "192.0.2.5");
    }

    #[test]
    fn test_client_ip_unknown() {
        assert_eq!(client_ip(&request(&[])), "unknown");
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
    }

    #[test]
    fn test_remaining_saturates() {
        let mut headers = HeaderMap::new();
        let policy = RateLimitPolicy::new("t", 5, Duration::from_secs(60));
        set_limit_headers(
            &mut headers,
            &policy,
            &Increment {
                count: 9,
                reset: Duration::from_secs(12),
            },
        );

        assert_eq!(headers[&X_RATELIMIT_LIMIT], "5");
        assert_eq!(headers[&X_RATELIMIT_REMAINING], "0");
        assert_eq!(headers[&X_RATELIMIT_RESET], "12");
    }
}
