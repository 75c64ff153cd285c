//! Role-based authorization.
//!
//! [`RoleGuard`] runs after authentication and asks the [`RoleLookup`] whether the
//! caller holds a role. The three lookup outcomes stay distinct:
//!
//! | Lookup | Response |
//! |--------|----------|
//! | `Ok(true)` | handler runs |
//! | `Ok(false)` | 403 `FORBIDDEN` |
//! | `Err(_)` | 503 `SERVICE_UNAVAILABLE`, reported |

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tastelog_auth::RoleLookup;
use tastelog_core::{AppError, ErrorReport, TelemetrySink};
use tracing::{debug, warn};

use crate::middleware::context::{current_user_id, report_context};
use crate::middleware::pipeline::{Guard, Stage};

#[derive(Debug, Clone)]
pub struct RoleGuard {
    role: String,
    lookup: Arc<dyn RoleLookup>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl RoleGuard {
    pub fn new(
        role: impl Into<String>,
        lookup: Arc<dyn RoleLookup>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            role: role.into(),
            lookup,
            telemetry,
        }
    }
}

#[async_trait]
impl Guard for RoleGuard {
    fn stage(&self) -> Stage {
        Stage::Authorize
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        let Some(user_id) = current_user_id() else {
            return AppError::auth_required().into_response();
        };

        match self.lookup.has_role(&user_id, &self.role).await {
            Ok(true) => next.run(req).await,
            Ok(false) => {
                debug!(role = %self.role, "Caller lacks required role");
                AppError::forbidden(format!("Access denied. Required role: {}", self.role))
                    .into_response()
            }
            Err(e) => {
                warn!(role = %self.role, error = %e, "Role lookup failed");
                self.telemetry.report(
                    ErrorReport::new("RoleLookupFailed", e.to_string(), report_context())
                        .with_extra("role", self.role.clone()),
                );
                AppError::service_unavailable("Authorization is temporarily unavailable")
                    .into_response()
            }
        }
    }
}
