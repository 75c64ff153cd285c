use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tastelog_auth::{IdentityProvider, UserIdentity, VerifyError};
use tastelog_core::{AppError, ErrorReport, TelemetrySink};
use tastelog_observability::track_auth_failure;
use tracing::{debug, warn};

use crate::middleware::context::{report_context, set_user};
use crate::middleware::pipeline::{Guard, Stage};

/// Verifies the bearer credential and records the caller.
///
/// On success the [`UserIdentity`] is stored in the request extensions, where
/// [`AuthUser`] picks it up, and the user id joins the correlation context.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    provider: Arc<dyn IdentityProvider>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl AuthGuard {
    pub fn new(provider: Arc<dyn IdentityProvider>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            provider,
            telemetry,
        }
    }

    fn reject(&self, req: &Request, error: VerifyError) -> Response {
        let path = req.uri().path().to_string();

        if error.is_rejection() {
            let reason = match error {
                VerifyError::Expired => "expired",
                _ => "invalid",
            };
            track_auth_failure(reason);
            debug!(reason, "Rejected bearer credential");

            // The report names the reason only, never the credential.
            self.telemetry.report(
                ErrorReport::new("AuthInvalid", error.to_string(), report_context())
                    .with_extra("path", path),
            );
            return AppError::auth_invalid().into_response();
        }

        track_auth_failure("provider_unavailable");
        warn!(error = %error, "Identity provider unavailable");
        self.telemetry.report(
            ErrorReport::new("IdentityProviderUnavailable", error.to_string(), report_context())
                .with_extra("path", path),
        );
        AppError::service_unavailable("Authentication is temporarily unavailable").into_response()
    }
}

#[async_trait]
impl Guard for AuthGuard {
    fn stage(&self) -> Stage {
        Stage::Auth
    }

    async fn handle(&self, mut req: Request, next: Next) -> Response {
        let Some(authorization) = req.headers().typed_get::<Authorization<Bearer>>() else {
            track_auth_failure("missing");
            return AppError::auth_required().into_response();
        };

        let token = authorization.token().trim();
        if token.is_empty() {
            track_auth_failure("missing");
            return AppError::auth_required().into_response();
        }

        match self.provider.verify(token).await {
            Ok(identity) => {
                set_user(&identity.user_id);
                req.extensions_mut().insert(identity);
                next.run(req).await
            }
            Err(e) => self.reject(&req, e),
        }
    }
}

/// The verified caller of a route behind [`AuthGuard`].
///
/// Rejects with 401 if the route is not guarded.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.0.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.0.has_role(role)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserIdentity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(AppError::auth_required)
    }
}
