use axum::Router;
use tastelog_config::{AUTH_SENSITIVE, GENERAL_API};

use crate::middleware::dispatcher::{MethodMap, create_handler};
use crate::middleware::pipeline::Pipeline;
use crate::state::AppState;

use super::controller::{get_profile, refresh_token};

pub fn init_auth_router(state: &AppState) -> Router<AppState> {
    let sensitive = Pipeline::new(state)
        .csrf()
        .rate_limit(AUTH_SENSITIVE)
        .auth();
    let profile = Pipeline::new(state).auth().rate_limit_per_user(GENERAL_API);

    Router::new()
        .route(
            "/api/auth/refresh",
            create_handler(MethodMap::new().route(sensitive.post(refresh_token))),
        )
        .route(
            "/api/auth/me",
            create_handler(MethodMap::new().route(profile.get(get_profile))),
        )
}
