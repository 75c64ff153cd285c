use axum::Router;
use tastelog_auth::ADMIN_ROLE;
use tastelog_config::{GENERAL_API, PUBLIC_READ, STRICT};

use crate::middleware::dispatcher::{MethodMap, create_handler};
use crate::middleware::pipeline::Pipeline;
use crate::state::AppState;

use super::controller::{create_tasting, delete_tasting, get_tasting, list_tastings};
use super::model::NewTasting;

pub fn init_tastings_router(state: &AppState) -> Router<AppState> {
    let read = Pipeline::new(state).rate_limit(PUBLIC_READ);
    let write = Pipeline::new(state)
        .csrf()
        .auth()
        .rate_limit_per_user(GENERAL_API)
        .validate::<NewTasting>();
    let moderate = Pipeline::new(state)
        .csrf()
        .rate_limit(STRICT)
        .auth()
        .require_role(ADMIN_ROLE);

    Router::new()
        .route(
            "/api/tastings",
            create_handler(
                MethodMap::new()
                    .route(read.get(list_tastings))
                    .route(write.post(create_tasting)),
            ),
        )
        .route(
            "/api/tastings/{id}",
            create_handler(
                MethodMap::new()
                    .route(read.get(get_tasting))
                    .route(moderate.delete(delete_tasting)),
            ),
        )
}
