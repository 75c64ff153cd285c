//! Counter key generation.
//!
//! Keys have the form `{prefix}:ratelimit:{bucket}:{hash}`, where the hash is the
//! SHA-256 of the caller identity. Raw IPs and user ids never reach the store.

use std::fmt;

use sha2::{Digest, Sha256};

/// Whose requests a counter tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    User(String),
    Ip(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Ip(addr) => write!(f, "ip:{}", addr),
        }
    }
}

/// Builds the counter key for `identity` in `bucket`.
pub fn rate_limit_key(prefix: &str, bucket: &str, identity: &Identity) -> String {
    let digest = Sha256::digest(identity.to_string().as_bytes());
    format!("{}:ratelimit:{}:{}", prefix, bucket, hex::encode(digest))
}
