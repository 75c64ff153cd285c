use axum::Router;
use tastelog_config::PUBLIC_READ;

use crate::middleware::dispatcher::{MethodMap, create_handler};
use crate::middleware::pipeline::Pipeline;
use crate::state::AppState;

use super::controller::health;

pub fn init_health_router(state: &AppState) -> Router<AppState> {
    let public = Pipeline::new(state).rate_limit(PUBLIC_READ);

    Router::new().route(
        "/api/health",
        create_handler(MethodMap::new().route(public.get(health))),
    )
}
