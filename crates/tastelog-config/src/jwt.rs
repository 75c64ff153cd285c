use std::env;

/// Settings for the JWT identity provider.
///
/// - `JWT_SECRET`: HMAC secret
/// - `JWT_ACCESS_EXPIRY`: lifetime of issued access tokens in seconds (default: 3600)
/// - `JWT_LEEWAY_SECS`: clock skew tolerated when checking `exp` (default: 30)
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: i64,
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "your-secret-key-change-in-production".to_string(),
            access_token_expiry: 3600, // 1 hour
            leeway_secs: 30,
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            secret: env::var("JWT_SECRET").unwrap_or(defaults.secret),
            access_token_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.access_token_expiry),
            leeway_secs: env::var("JWT_LEEWAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.leeway_secs),
        }
    }
}
