//! Rate limiting policies and counter-store configuration.
//!
//! # Policies
//!
//! A [`RateLimitPolicy`] is a named fixed window: at most `max_requests` per
//! `window` for one caller. Four canonical policies cover the route classes of the
//! API:
//!
//! | Policy | Limit | Window | Store failure |
//! |--------|-------|--------|---------------|
//! | [`PUBLIC_READ`] | 100 | 1 min | fail-open |
//! | [`AUTH_SENSITIVE`] | 5 | 15 min | fail-closed |
//! | [`GENERAL_API`] | 60 | 1 min | fail-open |
//! | [`STRICT`] | 10 | 1 min | fail-open |
//!
//! # Store selection
//!
//! Counters live in a process-local table unless a shared store is configured:
//!
//! - `RATE_LIMIT_REST_URL` + `RATE_LIMIT_REST_TOKEN`: REST store
//! - `RATE_LIMIT_REDIS_URL`: direct Redis store
//! - `RATE_LIMIT_TIMEOUT_MS`: REST request timeout (default: 500)
//! - `RATE_LIMIT_RETRIES`: REST retries on connect errors (default: 1)
//! - `RATE_LIMIT_SWEEP_SECS`: local store sweep interval (default: 60)
//! - `RATE_LIMIT_KEY_PREFIX`: key prefix (default: `tastelog`)

use std::borrow::Cow;
use std::env;
use std::time::Duration;

/// What a rate-limit guard does when its counter store cannot be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Let the request through and log a warning.
    Open,
    /// Reject the request with 503.
    Closed,
}

/// An immutable, named fixed-window limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Bucket name, part of every counter key.
    pub name: Cow<'static, str>,
    pub max_requests: u64,
    pub window: Duration,
    pub on_store_failure: FailureMode,
}

/// Anonymous reads of public content (feeds, tasting pages).
pub const PUBLIC_READ: RateLimitPolicy = RateLimitPolicy {
    name: Cow::Borrowed("public-read"),
    max_requests: 100,
    window: Duration::from_secs(60),
    on_store_failure: FailureMode::Open,
};

/// Sign-in, sign-up and password flows.
pub const AUTH_SENSITIVE: RateLimitPolicy = RateLimitPolicy {
    name: Cow::Borrowed("auth-sensitive"),
    max_requests: 5,
    window: Duration::from_secs(15 * 60),
    on_store_failure: FailureMode::Closed,
};

/// Authenticated API traffic.
pub const GENERAL_API: RateLimitPolicy = RateLimitPolicy {
    name: Cow::Borrowed("general-api"),
    max_requests: 60,
    window: Duration::from_secs(60),
    on_store_failure: FailureMode::Open,
};

/// Expensive or abuse-prone endpoints.
pub const STRICT: RateLimitPolicy = RateLimitPolicy {
    name: Cow::Borrowed("strict"),
    max_requests: 10,
    window: Duration::from_secs(60),
    on_store_failure: FailureMode::Open,
};

impl RateLimitPolicy {
    pub fn new(name: impl Into<Cow<'static, str>>, max_requests: u64, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
            on_store_failure: FailureMode::Open,
        }
    }

    #[must_use]
    pub fn fail_closed(mut self) -> Self {
        self.on_store_failure = FailureMode::Closed;
        self
    }

    #[must_use]
    pub fn fail_open(mut self) -> Self {
        self.on_store_failure = FailureMode::Open;
        self
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

/// Which counter store the factory should try to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Rest { url: String, token: String },
    Redis { url: String },
    Local,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
    pub redis_url: Option<String>,
    /// Timeout for a single REST store call.
    pub request_timeout: Duration,
    /// Retries on connect errors only; a request that may have reached the
    /// server is never retried.
    pub retries: u32,
    pub sweep_interval: Duration,
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rest_url: None,
            rest_token: None,
            redis_url: None,
            request_timeout: Duration::from_millis(500),
            retries: 1,
            sweep_interval: Duration::from_secs(60),
            key_prefix: "tastelog".to_string(),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            rest_url: non_empty_var("RATE_LIMIT_REST_URL"),
            rest_token: non_empty_var("RATE_LIMIT_REST_TOKEN"),
            redis_url: non_empty_var("RATE_LIMIT_REDIS_URL"),
            request_timeout: env::var("RATE_LIMIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            retries: env::var("RATE_LIMIT_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retries),
            sweep_interval: env::var("RATE_LIMIT_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }

    /// REST credentials win over a Redis URL; with neither, counters stay local.
    pub fn backend(&self) -> StoreBackend {
        match (&self.rest_url, &self.rest_token, &self.redis_url) {
            (Some(url), Some(token), _) => StoreBackend::Rest {
                url: url.clone(),
                token: token.clone(),
            },
            (_, _, Some(url)) => StoreBackend::Redis { url: url.clone() },
            _ => StoreBackend::Local,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_policies_within_bounds() {
        for policy in [PUBLIC_READ, AUTH_SENSITIVE, GENERAL_API, STRICT] {
            assert!((5..=100).contains(&policy.max_requests), "{}", policy.name);
            assert!(policy.window >= Duration::from_secs(60));
            assert!(policy.window <= Duration::from_secs(15 * 60));
        }
    }

    #[test]
    fn test_auth_sensitive_fails_closed() {
        assert_eq!(AUTH_SENSITIVE.on_store_failure, FailureMode::Closed);
        assert_eq!(PUBLIC_READ.on_store_failure, FailureMode::Open);
    }

    #[test]
    fn test_custom_policy() {
        let policy = RateLimitPolicy::new("tasting-export", 3, Duration::from_secs(120)).fail_closed();
        assert_eq!(policy.name, "tasting-export");
        assert_eq!(policy.window_ms(), 120_000);
        assert_eq!(policy.on_store_failure, FailureMode::Closed);
    }

    #[test]
    fn test_backend_defaults_to_local() {
        assert_eq!(RateLimitConfig::default().backend(), StoreBackend::Local);
    }

    #[test]
    fn test_backend_prefers_rest() {
        let config = RateLimitConfig {
            rest_url: Some("https://kv.example.com".into()),
            rest_token: Some("secret".into()),
            redis_url: Some("redis://cache:6379".into()),
            ..Default::default()
        };
        assert_eq!(
            config.backend(),
            StoreBackend::Rest {
                url: "https://kv.example.com".into(),
                token: "secret".into()
            }
        );
    }

    #[test]
    fn test_backend_rest_requires_token() {
        let config = RateLimitConfig {
            rest_url: Some("https://kv.example.com".into()),
            redis_url: Some("redis://cache:6379".into()),
            ..Default::default()
        };
        assert_eq!(
            config.backend(),
            StoreBackend::Redis {
                url: "redis://cache:6379".into()
            }
        );
    }
}
