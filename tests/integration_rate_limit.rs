mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tastelog::middleware::dispatcher::{MethodMap, create_handler};
use tastelog::middleware::pipeline::Pipeline;
use tastelog::router::{init_router, with_dispatch};
use tastelog::state::AppState;
use tastelog_config::RateLimitPolicy;
use tastelog_core::Reply;
use tastelog_ratelimit::{Increment, RateLimitStore, StoreError};

use common::{body_json, get, header, send, test_state};

#[derive(Debug)]
struct FailingStore;

#[async_trait]
impl RateLimitStore for FailingStore {
    async fn increment(&self, _key: &str, _window: Duration) -> Result<Increment, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

async fn sign_in() -> Reply<&'static str> {
    Reply::ok("welcome")
}

fn login_policy() -> RateLimitPolicy {
    RateLimitPolicy::new("login", 5, Duration::from_secs(60))
}

fn app_with_pipeline(state: AppState, pipeline: Pipeline) -> Router {
    let routes = Router::new().route(
        "/login",
        create_handler(MethodMap::new().route(pipeline.post(sign_in))),
    );
    with_dispatch(routes, state)
}

fn login(ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_sixth_request_in_window_is_rejected() {
    let (state, _) = test_state();
    let pipeline = Pipeline::new(&state).rate_limit(login_policy());
    let app = app_with_pipeline(state, pipeline);

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = send(&app, login("203.0.113.10")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit"), Some("5"));
        assert_eq!(header(&response, "x-ratelimit-remaining"), Some(expected_remaining));
        assert_eq!(header(&response, "x-ratelimit-reset"), Some("60"));
    }

    tokio::time::advance(Duration::from_secs(15)).await;

    let response = send(&app, login("203.0.113.10")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("0"));
    assert_eq!(header(&response, "retry-after"), Some("45"));
    assert!(header(&response, "x-request-id").is_some());

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
    assert!(body.get("data").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_budget_returns_after_window() {
    let (state, _) = test_state();
    let pipeline = Pipeline::new(&state).rate_limit(login_policy());
    let app = app_with_pipeline(state, pipeline);

    for _ in 0..6 {
        send(&app, login("203.0.113.11")).await;
    }

    tokio::time::advance(Duration::from_secs(60)).await;

    let response = send(&app, login("203.0.113.11")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("4"));
}

#[tokio::test(start_paused = true)]
async fn test_callers_have_separate_budgets() {
    let (state, _) = test_state();
    let pipeline = Pipeline::new(&state).rate_limit(login_policy());
    let app = app_with_pipeline(state, pipeline);

    for _ in 0..6 {
        send(&app, login("203.0.113.12")).await;
    }

    let response = send(&app, login("198.51.100.7")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("4"));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_guard_charges_once() {
    let (state, _) = test_state();
    let pipeline = Pipeline::new(&state)
        .rate_limit(login_policy())
        .rate_limit(login_policy());
    let app = app_with_pipeline(state, pipeline);

    let response = send(&app, login("203.0.113.13")).await;
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("4"));
}

#[tokio::test]
async fn test_fail_open_passes_through_with_full_budget() {
    let (mut state, sink) = test_state();
    state.rate_limit_store = Arc::new(FailingStore);
    let pipeline = Pipeline::new(&state).rate_limit(login_policy());
    let app = app_with_pipeline(state, pipeline);

    let response = send(&app, login("203.0.113.14")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("5"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("5"));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_fail_closed_rejects_with_503() {
    let (mut state, sink) = test_state();
    state.rate_limit_store = Arc::new(FailingStore);
    let pipeline = Pipeline::new(&state).rate_limit(login_policy().fail_closed());
    let app = app_with_pipeline(state, pipeline);

    let response = send(&app, login("203.0.113.15")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].error, "RateLimitStoreUnavailable");
    assert_eq!(reports[0].context.extra["bucket"], "login");
}

#[tokio::test]
async fn test_public_route_reports_budget() {
    let (state, _) = test_state();
    let app = init_router(state);

    let response = send(&app, get("/api/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit"), Some("100"));
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("99"));

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["rate_limit_backend"], "local");
}

fn login_as(ip: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/login")
        .header("x-forwarded-for", ip)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_per_user_limit_counts_each_user_separately() {
    let (state, _) = test_state();
    let alice = common::bearer(&state, "alice");
    let bob = common::bearer(&state, "bob");
    let policy = RateLimitPolicy::new("login", 2, Duration::from_secs(60));
    let pipeline = Pipeline::new(&state).auth().rate_limit_per_user(policy);
    let app = app_with_pipeline(state, pipeline);

    // Both users share one address.
    for _ in 0..2 {
        let response = send(&app, login_as("203.0.113.20", &alice)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = send(&app, login_as("203.0.113.20", &alice)).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = send(&app, login_as("203.0.113.20", &bob)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("1"));

    // A user keeps their budget across addresses.
    let moved = send(&app, login_as("198.51.100.4", &alice)).await;
    assert_eq!(moved.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn test_per_user_limit_skips_unauthenticated_requests() {
    let (state, _) = test_state();
    let alice = common::bearer(&state, "alice");
    let policy = RateLimitPolicy::new("login", 1, Duration::from_secs(60));
    let pipeline = Pipeline::new(&state).rate_limit_per_user(policy).auth();
    let app = app_with_pipeline(state, pipeline);

    for _ in 0..3 {
        let response = send(&app, login("203.0.113.21")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(header(&response, "x-ratelimit-limit").is_none());
    }

    let response = send(&app, login_as("203.0.113.21", &alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-remaining"), Some("0"));
}
