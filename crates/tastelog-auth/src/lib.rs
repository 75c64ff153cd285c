//! # Tastelog Auth
//!
//! Identity verification for the Tastelog API.
//!
//! - [`claims`]: access token claims
//! - [`jwt`]: token creation and verification
//! - [`provider`]: the [`IdentityProvider`] interface consumed by the authentication
//!   guard, and its JWT implementation
//! - [`roles`]: the [`RoleLookup`] interface consumed by authorization guards
//!
//! # Example
//!
//! ```ignore
//! use tastelog_auth::{IdentityProvider, JwtIdentityProvider};
//! use tastelog_config::JwtConfig;
//!
//! let provider = JwtIdentityProvider::new(JwtConfig::from_env());
//! let identity = provider.verify(token).await?;
//! println!("User ID: {}", identity.user_id);
//! ```

pub mod claims;
pub mod jwt;
pub mod provider;
pub mod roles;

pub use claims::Claims;
pub use jwt::{create_access_token, encode_claims, verify_token};
pub use provider::{IdentityProvider, JwtIdentityProvider, UserIdentity, VerifyError};
pub use roles::{ADMIN_ROLE, RoleLookup, RoleLookupError, StaticRoleLookup};
