//! Identity provider interface.
//!
//! The authentication guard only knows [`IdentityProvider::verify`]. The shipped
//! implementation verifies JWTs locally; a provider that calls out to a remote
//! identity service reports outages as [`VerifyError::Unavailable`] so the guard can
//! tell "bad credential" apart from "cannot check right now".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tastelog_config::JwtConfig;

use crate::claims::Claims;
use crate::jwt::verify_token;

/// A fully verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl UserIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<Claims> for UserIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            roles: claims.roles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl VerifyError {
    /// `true` when the credential itself was rejected, as opposed to the provider
    /// being unreachable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Expired | Self::Invalid(_))
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    async fn verify(&self, bearer_token: &str) -> Result<UserIdentity, VerifyError>;
}

/// Verifies HS256 access tokens with a shared secret.
#[derive(Debug, Clone)]
pub struct JwtIdentityProvider {
    config: JwtConfig,
}

impl JwtIdentityProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, bearer_token: &str) -> Result<UserIdentity, VerifyError> {
        verify_token(bearer_token, &self.config).map(UserIdentity::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::create_access_token;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "provider-test-secret-with-enough-length".to_string(),
            access_token_expiry: 600,
            leeway_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_jwt_provider_resolves_identity() {
        let provider = JwtIdentityProvider::new(config());
        let token =
            create_access_token("user-7", None, vec!["admin".to_string()], &config()).unwrap();

        let identity = provider.verify(&token).await.unwrap();
        assert_eq!(identity.user_id, "user-7");
        assert!(identity.has_role("admin"));
        assert!(!identity.has_role("moderator"));
    }

    #[tokio::test]
    async fn test_jwt_provider_rejects_garbage() {
        let provider = JwtIdentityProvider::new(config());
        let err = provider.verify("abc.def.ghi").await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_unavailable_is_not_rejection() {
        assert!(!VerifyError::Unavailable("timeout".into()).is_rejection());
        assert!(VerifyError::Expired.is_rejection());
    }
}
