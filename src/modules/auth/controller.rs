use axum::extract::State;
use tracing::instrument;

use tastelog_auth::create_access_token;
use tastelog_core::{AppError, Reply};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::model::{Profile, TokenResponse};
use crate::state::AppState;

/// Issues a fresh access token for the caller.
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id()))]
pub async fn refresh_token(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Reply<TokenResponse>, AppError> {
    let AuthUser(identity) = auth_user;
    let access_token = create_access_token(
        &identity.user_id,
        identity.email.as_deref(),
        identity.roles,
        &state.jwt_config,
    )?;

    Ok(Reply::ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_config.access_token_expiry,
    }))
}

#[instrument(skip(auth_user))]
pub async fn get_profile(auth_user: AuthUser) -> Reply<Profile> {
    let AuthUser(identity) = auth_user;
    Reply::ok(Profile {
        user_id: identity.user_id,
        email: identity.email,
        roles: identity.roles,
    })
}
