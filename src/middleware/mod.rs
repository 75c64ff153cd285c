//! Request pipeline.
//!
//! # Modules
//!
//! - [`context`]: per-request correlation context (request id, resolved user)
//! - [`dispatcher`]: outermost layer, method maps, 404/405/panic handling
//! - [`pipeline`]: the [`Guard`](pipeline::Guard) interface and the builder that
//!   orders guards
//! - [`csrf`], [`rate_limit`], [`auth`], [`role`], [`validation`]: the guards
//!
//! # Request Flow
//!
//! 1. `dispatch` assigns a request id and opens the context
//! 2. The router matches the path (404 otherwise) and the method (405 otherwise)
//! 3. The route's guards run in stage order; any of them may answer
//! 4. The handler runs with [`AuthUser`](auth::AuthUser) and
//!    [`Validated<T>`](validation::Validated) available
//! 5. `dispatch` reports internal failures and stamps `X-Request-Id`
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::{auth::AuthUser, validation::Validated};
//!
//! async fn create_tasting(
//!     AuthUser(user): AuthUser,
//!     Validated(draft): Validated<NewTasting>,
//! ) -> Result<Reply<Tasting>, AppError> {
//!     // Only reached when every guard passed
//! }
//! ```

pub mod auth;
pub mod context;
pub mod csrf;
pub mod dispatcher;
pub mod pipeline;
pub mod rate_limit;
pub mod role;
pub mod validation;
