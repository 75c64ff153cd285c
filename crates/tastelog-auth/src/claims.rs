//! JWT claim structure for access tokens.

use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
///
/// - `sub`: user id (subject)
/// - `email`: optional contact address
/// - `roles`: role names granted to the user
/// - `exp` / `iat`: expiry and issued-at timestamps (Unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}
