use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tastelog::state::AppState;
use tastelog_auth::create_access_token;
use tastelog_core::MemorySink;
use tower::ServiceExt;

pub const CSRF_HEADER: &str = "x-csrf-token";

/// Application state backed by a fresh local store and an in-memory sink.
pub fn test_state() -> (AppState, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (AppState::local(sink.clone()), sink)
}

#[allow(dead_code)]
pub fn bearer(state: &AppState, user_id: &str) -> String {
    let token = create_access_token(user_id, Some("taster@example.com"), vec![], &state.jwt_config)
        .unwrap();
    format!("Bearer {}", token)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
