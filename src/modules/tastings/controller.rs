use axum::extract::{Path, State, rejection::PathRejection};
use tracing::instrument;
use uuid::Uuid;

use tastelog_core::{AppError, Reply};

use crate::middleware::auth::AuthUser;
use crate::middleware::validation::Validated;
use crate::modules::tastings::model::{NewTasting, Tasting};
use crate::state::AppState;

/// Any id that cannot name a tasting, including one that fails to decode, is a 404.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(id) = path.map_err(|_| AppError::not_found())?;
    Uuid::parse_str(&id).map_err(|_| AppError::not_found())
}

#[instrument(skip(state))]
pub async fn list_tastings(State(state): State<AppState>) -> Reply<Vec<Tasting>> {
    Reply::ok(state.tastings.list().await)
}

#[instrument(skip(state))]
pub async fn get_tasting(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Reply<Tasting>, AppError> {
    let tasting = state
        .tastings
        .get(parse_id(path)?)
        .await
        .ok_or_else(AppError::not_found)?;

    Ok(Reply::ok(tasting))
}

#[instrument(skip(state, dto), fields(user_id = %auth_user.user_id()))]
pub async fn create_tasting(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Validated(dto): Validated<NewTasting>,
) -> Reply<Tasting> {
    Reply::created(state.tastings.create(auth_user.user_id(), dto).await)
}

#[instrument(skip(state))]
pub async fn delete_tasting(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Reply<Uuid>, AppError> {
    let id = parse_id(path)?;
    if !state.tastings.delete(id).await {
        return Err(AppError::not_found());
    }

    Ok(Reply::ok(id))
}
