mod common;

use std::collections::HashSet;

use axum::Router;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tastelog::middleware::context::current_request_id;
use tastelog::middleware::dispatcher::{MethodMap, create_handler};
use tastelog::middleware::pipeline::Pipeline;
use tastelog::router::{init_router, with_dispatch};
use tastelog::state::AppState;
use tastelog_core::{AppError, Reply};
use tokio::task::JoinSet;

use common::{bearer, body_json, get, header, send, test_state};

async fn broken() -> Result<Reply<()>, AppError> {
    Err(AppError::internal(anyhow::anyhow!(
        "connection refused to db-primary:5432"
    )))
}

async fn explode() -> Reply<()> {
    panic!("kaboom")
}

async fn whoami() -> String {
    tokio::task::yield_now().await;
    current_request_id()
}

fn test_app(state: AppState) -> Router {
    let authenticated = Pipeline::new(&state).auth();
    let routes = Router::new()
        .route("/broken", create_handler(MethodMap::new().route(axum::routing::get(broken))))
        .route(
            "/broken-authenticated",
            create_handler(MethodMap::new().route(authenticated.get(broken))),
        )
        .route("/explode", create_handler(MethodMap::new().route(axum::routing::get(explode))))
        .route("/whoami", create_handler(MethodMap::new().route(axum::routing::get(whoami))));
    with_dispatch(routes, state)
}

#[tokio::test]
async fn test_unknown_path_is_not_found_envelope() {
    let (state, sink) = test_state();
    let app = init_router(state);

    let response = send(&app, get("/api/nope")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(header(&response, "x-request-id").is_some());
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_responses_carry_route_template_not_raw_path() {
    let (state, _) = test_state();
    let app = init_router(state);

    for _ in 0..3 {
        let uri = format!("/api/tastings/{}", uuid::Uuid::new_v4());
        let response = send(&app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
            Some("/api/tastings/{id}")
        );
    }

    let response = send(&app, get("/wp-admin/setup.php")).await;
    assert!(response.extensions().get::<MatchedPath>().is_none());
}

#[tokio::test]
async fn test_unmapped_method_skips_guards() {
    let (state, _) = test_state();
    let app = init_router(state);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/tastings")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(header(&response, "x-ratelimit-limit").is_none());
    assert!(header(&response, "x-request-id").is_some());
    assert_eq!(body_json(response).await["error"]["code"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_internal_error_is_reported_once_and_hidden() {
    let (state, sink) = test_state();
    let app = test_app(state);

    let response = send(&app, get("/broken")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = header(&response, "x-request-id").unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(body["error"]["message"], "An unexpected error occurred");
    assert!(!body.to_string().contains("db-primary"));

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].error, "InternalError");
    assert!(reports[0].message.contains("db-primary"));
    assert_eq!(reports[0].context.request_id, request_id);
    assert_eq!(reports[0].context.user_id, None);
    assert_eq!(reports[0].context.extra["method"], "GET");
    assert_eq!(reports[0].context.extra["path"], "/broken");
}

#[tokio::test]
async fn test_report_carries_authenticated_user() {
    let (state, sink) = test_state();
    let authorization = bearer(&state, "user-9");
    let app = test_app(state);

    let request = Request::builder()
        .uri("/broken-authenticated")
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].context.user_id.as_deref(), Some("user-9"));
}

#[tokio::test]
async fn test_panic_becomes_generic_failure() {
    let (state, sink) = test_state();
    let app = test_app(state);

    let response = send(&app, get("/explode")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = header(&response, "x-request-id").unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(!body.to_string().contains("kaboom"));

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].error, "Panic");
    assert_eq!(reports[0].message, "kaboom");
    assert_eq!(reports[0].context.request_id, request_id);

    // The server keeps serving after a panic.
    assert_eq!(send(&app, get("/whoami")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let (state, _) = test_state();
    let app = init_router(state);

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let response = send(&app, get("/api/health")).await;
        let id = header(&response, "x-request-id").unwrap().to_string();
        assert_ne!(id, "unset");
        assert!(seen.insert(id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_their_own_context() {
    let (state, _) = test_state();
    let app = test_app(state);

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let app = app.clone();
        tasks.spawn(async move {
            let response = send(&app, get("/whoami")).await;
            let header_id = header(&response, "x-request-id").unwrap().to_string();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (header_id, String::from_utf8(bytes.to_vec()).unwrap())
        });
    }

    let mut seen = HashSet::new();
    while let Some(result) = tasks.join_next().await {
        let (header_id, observed_id) = result.unwrap();
        assert_eq!(header_id, observed_id);
        assert!(seen.insert(header_id));
    }
    assert_eq!(seen.len(), 32);
}

#[test]
fn test_request_id_outside_a_request_is_sentinel() {
    assert_eq!(current_request_id(), "unset");
}
