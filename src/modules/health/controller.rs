use axum::extract::State;
use serde::Serialize;

use tastelog_core::Reply;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub rate_limit_backend: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Reply<Health> {
    Reply::ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rate_limit_backend: state.rate_limit_store.backend(),
    })
}
