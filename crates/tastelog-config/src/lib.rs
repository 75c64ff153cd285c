//! # Tastelog Config
//!
//! Configuration types for the Tastelog API, loaded from environment variables:
//!
//! - [`server`]: bind address, deployment mode, slow-request threshold, body limit
//! - [`rate_limit`]: canonical rate-limit policies and counter-store selection
//! - [`jwt`]: identity provider settings
//! - [`csrf`]: anti-forgery header name
//! - [`cors`]: allowed origins
//! - [`roles`]: static role assignments
//! - [`telemetry`]: error-tracking delivery
//!
//! Every `from_env` falls back to defaults when a variable is missing or does not
//! parse.
//!
//! # Example
//!
//! ```ignore
//! use tastelog_config::{RateLimitConfig, ServerConfig};
//!
//! let server = ServerConfig::from_env();
//! let rate_limit = RateLimitConfig::from_env();
//! ```

pub mod cors;
pub mod csrf;
pub mod jwt;
pub mod rate_limit;
pub mod roles;
pub mod server;
pub mod telemetry;

pub use cors::CorsConfig;
pub use csrf::CsrfConfig;
pub use jwt::JwtConfig;
pub use rate_limit::{
    AUTH_SENSITIVE, FailureMode, GENERAL_API, PUBLIC_READ, RateLimitConfig, RateLimitPolicy, STRICT,
    StoreBackend,
};
pub use roles::RoleConfig;
pub use server::{DeploymentMode, ServerConfig};
pub use telemetry::TelemetryConfig;
