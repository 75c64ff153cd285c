use axum::Router;
use tastelog_auth::ADMIN_ROLE;
use tastelog_config::STRICT;

use crate::middleware::dispatcher::{MethodMap, create_handler};
use crate::middleware::pipeline::Pipeline;
use crate::state::AppState;

use super::controller::get_stats;

pub fn init_admin_router(state: &AppState) -> Router<AppState> {
    let admin = Pipeline::new(state)
        .rate_limit(STRICT)
        .auth()
        .require_role(ADMIN_ROLE);

    Router::new().route(
        "/api/admin/stats",
        create_handler(MethodMap::new().route(admin.get(get_stats))),
    )
}
