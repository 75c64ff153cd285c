//! Guard composition.
//!
//! A [`Pipeline`] is an ordered list of guards wrapped around one endpoint. Guards
//! always run in [`Stage`] order, whatever order the builder methods were called in:
//!
//! ```text
//! CSRF -> rate limit (per IP) -> authentication -> rate limit (per user)
//!      -> authorization -> validation -> handler
//! ```
//!
//! Any guard may answer the request itself; later guards and the handler then never
//! run.
//!
//! # Example
//!
//! ```ignore
//! let write = Pipeline::new(&state)
//!     .validate::<NewTasting>()
//!     .auth()
//!     .rate_limit(GENERAL_API)
//!     .csrf();
//!
//! let route = create_handler(MethodMap::new().route(write.post(create_tasting)));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    handler::Handler,
    middleware::{self, Next},
    response::Response,
    routing::{self, MethodRouter},
};
use serde::de::DeserializeOwned;
use tastelog_config::RateLimitPolicy;
use validator::Validate;

use crate::middleware::{
    auth::AuthGuard, csrf::CsrfGuard, rate_limit::RateLimitGuard, role::RoleGuard,
    validation::ValidationGuard,
};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Csrf,
    RateLimit,
    Auth,
    UserRateLimit,
    Authorize,
    Validation,
}

/// A middleware unit that may short-circuit a request.
#[async_trait]
pub trait Guard: Send + Sync + fmt::Debug + 'static {
    fn stage(&self) -> Stage;

    /// Either answers the request or passes it to `next`.
    async fn handle(&self, req: Request, next: Next) -> Response;
}

async fn run_guard(State(guard): State<Arc<dyn Guard>>, req: Request, next: Next) -> Response {
    guard.handle(req, next).await
}

#[derive(Clone)]
pub struct Pipeline {
    state: AppState,
    guards: Vec<Arc<dyn Guard>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            guards: Vec::new(),
        }
    }

    /// Adds a guard at its stage. Guards of the same stage keep insertion order.
    #[must_use]
    pub fn guard<G: Guard>(mut self, guard: G) -> Self {
        self.guards.push(Arc::new(guard));
        self.guards.sort_by_key(|guard| guard.stage());
        self
    }

    #[must_use]
    pub fn csrf(self) -> Self {
        let guard = CsrfGuard::new(&self.state.csrf_config);
        self.guard(guard)
    }

    #[must_use]
    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        let guard = RateLimitGuard::new(
            policy,
            self.state.rate_limit_store.clone(),
            self.state.telemetry.clone(),
        )
        .with_key_prefix(&self.state.rate_limit_config.key_prefix);
        self.guard(guard)
    }

    /// Like [`Pipeline::rate_limit`], but counted per authenticated user after the
    /// authentication stage.
    #[must_use]
    pub fn rate_limit_per_user(self, policy: RateLimitPolicy) -> Self {
        let guard = RateLimitGuard::new(
            policy,
            self.state.rate_limit_store.clone(),
            self.state.telemetry.clone(),
        )
        .with_key_prefix(&self.state.rate_limit_config.key_prefix)
        .per_user();
        self.guard(guard)
    }

    #[must_use]
    pub fn auth(self) -> Self {
        let guard = AuthGuard::new(
            self.state.identity_provider.clone(),
            self.state.telemetry.clone(),
        );
        self.guard(guard)
    }

    #[must_use]
    pub fn require_role(self, role: &str) -> Self {
        let guard = RoleGuard::new(
            role,
            self.state.role_lookup.clone(),
            self.state.telemetry.clone(),
        );
        self.guard(guard)
    }

    #[must_use]
    pub fn validate<T>(self) -> Self
    where
        T: DeserializeOwned + Validate + Clone + Send + Sync + 'static,
    {
        let guard = ValidationGuard::<T>::new(self.state.server_config.max_body_bytes);
        self.guard(guard)
    }

    /// Stages in execution order.
    pub fn stages(&self) -> Vec<Stage> {
        self.guards.iter().map(|guard| guard.stage()).collect()
    }

    /// Wraps every method endpoint of `route` in this pipeline's guards.
    ///
    /// Only matched methods are guarded; a 405 fallback added later is not.
    pub fn wrap(&self, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
        // The last layer applied runs first.
        self.guards.iter().rev().fold(route, |route, guard| {
            route.route_layer(middleware::from_fn_with_state(guard.clone(), run_guard))
        })
    }

    pub fn get<H, T>(&self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.wrap(routing::get(handler))
    }

    pub fn post<H, T>(&self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.wrap(routing::post(handler))
    }

    pub fn put<H, T>(&self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.wrap(routing::put(handler))
    }

    pub fn patch<H, T>(&self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.wrap(routing::patch(handler))
    }

    pub fn delete<H, T>(&self, handler: H) -> MethodRouter<AppState>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.wrap(routing::delete(handler))
    }
}
