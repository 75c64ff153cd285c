mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tastelog::router::init_router;
use tastelog_auth::{ADMIN_ROLE, StaticRoleLookup};

use common::{CSRF_HEADER, bearer, body_json, get, send, test_state};

#[tokio::test]
async fn test_undecodable_id_is_not_found_envelope() {
    let (state, _) = test_state();
    let app = init_router(state);

    let response = send(&app, get("/api/tastings/%FF")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_id_is_not_found_envelope() {
    let (state, _) = test_state();
    let app = init_router(state);

    let response = send(&app, get("/api/tastings/not-a-uuid")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_with_undecodable_id_is_not_found_envelope() {
    let (mut state, _) = test_state();
    state.role_lookup = Arc::new(StaticRoleLookup::new().grant("admin-1", ADMIN_ROLE));
    let authorization = bearer(&state, "admin-1");
    let app = init_router(state);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/tastings/%FF")
        .header("authorization", authorization)
        .header(CSRF_HEADER, "1")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}
