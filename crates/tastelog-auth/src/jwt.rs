//! JWT issuing and verification.
//!
//! Tokens are HS256-signed with the secret from [`JwtConfig`]. Verification checks
//! the signature and expiry (with the configured leeway) and rejects tokens that do
//! not name a subject.
//!
//! # Example
//!
//! ```ignore
//! use tastelog_auth::{create_access_token, verify_token};
//! use tastelog_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token("user-42", Some("taster@example.com"), vec![], &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.sub, "user-42");
//! ```

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};

use tastelog_config::JwtConfig;

use crate::claims::Claims;
use crate::provider::VerifyError;

/// Creates a signed access token.
///
/// # Errors
///
/// Returns an error if encoding fails (e.g. an unusable key).
pub fn create_access_token(
    user_id: &str,
    email: Option<&str>,
    roles: Vec<String>,
    jwt_config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry.max(0) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        roles,
        exp,
        iat: now,
    };

    encode_claims(&claims, jwt_config)
}

/// Signs arbitrary claims. Exposed for issuing tokens with explicit timestamps.
pub fn encode_claims(
    claims: &Claims,
    jwt_config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
}

/// Verifies an access token and returns its claims.
///
/// # Errors
///
/// - [`VerifyError::Expired`] when `exp` lies in the past beyond the leeway
/// - [`VerifyError::Invalid`] for bad signatures, malformed tokens and tokens
///   without a subject
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, VerifyError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = jwt_config.leeway_secs;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => VerifyError::Expired,
        kind => VerifyError::Invalid(format!("{:?}", kind)),
    })?;

    if claims.sub.trim().is_empty() {
        return Err(VerifyError::Invalid("token has no subject".to_string()));
    }

    Ok(claims)
}
