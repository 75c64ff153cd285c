//! # Tastelog Rate Limit
//!
//! Fixed-window counter stores behind one interface, [`RateLimitStore`]:
//!
//! - [`LocalStore`]: in-process map with a periodic sweep
//! - [`RestStore`]: HTTP-fronted Redis, one atomic script per increment
//! - [`RedisStore`]: direct Redis connection running the same script
//!
//! [`build_store`] picks one at startup from [`RateLimitConfig`](tastelog_config::RateLimitConfig).
//!
//! # Example
//!
//! ```ignore
//! use tastelog_config::{DeploymentMode, RateLimitConfig, STRICT};
//! use tastelog_ratelimit::{Identity, build_store, rate_limit_key};
//!
//! let store = build_store(&RateLimitConfig::from_env(), DeploymentMode::Single).await;
//! let key = rate_limit_key("tastelog", &STRICT.name, &Identity::Ip("203.0.113.9".into()));
//! let inc = store.increment(&key, STRICT.window).await?;
//! ```

pub mod factory;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod rest;
pub mod store;

pub use factory::build_store;
pub use keys::{Identity, rate_limit_key};
pub use memory::LocalStore;
pub use crate::redis::RedisStore;
pub use rest::RestStore;
pub use store::{Increment, RateLimitStore, StoreError};
