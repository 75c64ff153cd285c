//! Anti-forgery header configuration.
//!
//! The CSRF guard only checks that the header is present on state-changing
//! requests. The value is not bound to a session or verified cryptographically.

use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Header that must accompany POST, PUT, PATCH and DELETE requests
    /// (`CSRF_HEADER`, default: `x-csrf-token`).
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header_name: "x-csrf-token".to_string(),
        }
    }
}

impl CsrfConfig {
    pub fn from_env() -> Self {
        Self {
            header_name: env::var("CSRF_HEADER")
                .map(|v| v.trim().to_ascii_lowercase())
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| Self::default().header_name),
        }
    }
}
