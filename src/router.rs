use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, middleware};
use tastelog_config::CorsConfig;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::middleware::dispatcher::{
    Dispatcher, X_REQUEST_ID, dispatch, handle_panic, not_found, stamp_matched_path,
};
use crate::middleware::rate_limit::{X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::modules::admin::init_admin_router;
use crate::modules::auth::init_auth_router;
use crate::modules::health::init_health_router;
use crate::modules::tastings::init_tastings_router;
use crate::state::AppState;

pub fn init_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(init_health_router(&state))
        .merge(init_auth_router(&state))
        .merge(init_tastings_router(&state))
        .merge(init_admin_router(&state));

    with_dispatch(routes, state)
}

/// Adds the 404 fallback, panic recovery, the dispatcher and CORS around `routes`.
pub fn with_dispatch(routes: Router<AppState>, state: AppState) -> Router {
    let dispatcher = Arc::new(Dispatcher::from_state(&state));
    let cors = cors_layer(&state.cors_config, &state.csrf_config.header_name);

    routes
        .fallback(not_found)
        .layer(middleware::from_fn(stamp_matched_path))
        .with_state(state)
        // Inside the dispatcher, so a panic is reported with its request context.
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(dispatcher, dispatch))
        .layer(cors)
}

fn cors_layer(config: &CorsConfig, csrf_header: &str) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let mut allowed_headers = vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];
    if let Ok(csrf_header) = HeaderName::try_from(csrf_header) {
        allowed_headers.push(csrf_header);
    }

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(allowed_headers)
        .expose_headers([
            X_REQUEST_ID,
            X_RATELIMIT_LIMIT,
            X_RATELIMIT_REMAINING,
            X_RATELIMIT_RESET,
            header::RETRY_AFTER,
        ])
        .allow_credentials(true)
}
