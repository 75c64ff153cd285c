mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tastelog::router::init_router;

use common::{CSRF_HEADER, bearer, body_json, get, header, send, test_state};

fn refresh(authorization: &str, csrf: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("authorization", authorization);
    if let Some(token) = csrf {
        builder = builder.header(CSRF_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_state_changing_request_without_header_is_rejected() {
    let (state, _) = test_state();
    let authorization = bearer(&state, "user-1");
    let app = init_router(state);

    let response = send(&app, refresh(&authorization, None)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // CSRF runs first, so the rate limiter never saw the request.
    assert!(header(&response, "x-ratelimit-limit").is_none());
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CSRF_MISSING");
}

#[tokio::test]
async fn test_blank_header_is_rejected() {
    let (state, _) = test_state();
    let authorization = bearer(&state, "user-1");
    let app = init_router(state);

    let response = send(&app, refresh(&authorization, Some("   "))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_any_present_value_is_accepted() {
    let (state, _) = test_state();
    let authorization = bearer(&state, "user-1");
    let app = init_router(state);

    let response = send(&app, refresh(&authorization, Some("x"))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_safe_methods_need_no_header() {
    let (state, _) = test_state();
    let app = init_router(state);

    let response = send(&app, get("/api/tastings")).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_header_name_is_configurable() {
    let (mut state, _) = test_state();
    state.csrf_config.header_name = "x-requested-with".to_string();
    let authorization = bearer(&state, "user-1");
    let app = init_router(state);

    let with_default = send(&app, refresh(&authorization, Some("x"))).await;
    assert_eq!(with_default.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("authorization", authorization)
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);
}
