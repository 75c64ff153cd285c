//! Anti-forgery header check.
//!
//! State-changing requests (POST, PUT, PATCH, DELETE) must carry a non-empty
//! anti-forgery header. Only presence is checked: the token is not bound to a
//! session, so a client that can set custom headers passes. Cross-site form posts
//! and simple requests cannot set the header, which is what this guard blocks.

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderName, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tastelog_config::CsrfConfig;
use tastelog_core::AppError;
use tracing::debug;

use crate::middleware::pipeline::{Guard, Stage};

const DEFAULT_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

#[derive(Debug, Clone)]
pub struct CsrfGuard {
    header: HeaderName,
}

impl CsrfGuard {
    /// An unusable header name in the config falls back to `x-csrf-token`.
    pub fn new(config: &CsrfConfig) -> Self {
        let header = HeaderName::try_from(config.header_name.as_str()).unwrap_or(DEFAULT_HEADER);
        Self { header }
    }
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

#[async_trait]
impl Guard for CsrfGuard {
    fn stage(&self) -> Stage {
        Stage::Csrf
    }

    async fn handle(&self, req: Request, next: Next) -> Response {
        if !is_state_changing(req.method()) {
            return next.run(req).await;
        }

        let present = req
            .headers()
            .get(&self.header)
            .is_some_and(|value| !value.as_bytes().iter().all(u8::is_ascii_whitespace));

        if !present {
            debug!(header = %self.header, "Missing anti-forgery header");
            return AppError::csrf_missing().into_response();
        }

        next.run(req).await
    }
}
