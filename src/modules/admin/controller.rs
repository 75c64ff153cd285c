use axum::extract::State;
use tracing::instrument;

use tastelog_core::Reply;

use crate::modules::tastings::model::TastingStats;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn get_stats(State(state): State<AppState>) -> Reply<TastingStats> {
    Reply::ok(state.tastings.stats().await)
}
