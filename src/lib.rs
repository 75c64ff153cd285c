//! # Tastelog API
//!
//! HTTP API for a food-tasting log, built with Rust and Axum. Every endpoint runs
//! behind the same request pipeline:
//!
//! - **Correlation**: each request gets an id, echoed as `X-Request-Id` and attached
//!   to every log line and error report
//! - **Rate limiting**: fixed-window policies backed by a local, REST or Redis
//!   counter store
//! - **Authentication**: bearer JWTs verified by an identity provider
//! - **Authorization**: role checks through a role lookup
//! - **Validation**: JSON bodies checked before the handler runs
//! - **CSRF**: anti-forgery header required on state-changing requests
//!
//! ## Architecture
//!
//! ```text
//! crates/
//! ├── tastelog-core/           # Response envelope, AppError, telemetry sinks
//! ├── tastelog-config/         # Environment configuration, rate-limit policies
//! ├── tastelog-auth/           # Identity provider, JWT, role lookup
//! ├── tastelog-ratelimit/      # Counter stores and store factory
//! └── tastelog-observability/  # Logging, tracing, metrics
//! src/
//! ├── middleware/              # Context, dispatcher, pipeline builder, guards
//! ├── modules/                 # Feature modules (health, auth, tastings, admin)
//! ├── router.rs                # Route table and outer layers
//! └── state.rs                 # Shared application state
//! ```
//!
//! ## Responses
//!
//! Every response body uses one envelope:
//!
//! ```json
//! { "success": true, "data": { "status": "ok" } }
//! { "success": false, "error": { "code": "RATE_LIMITED", "message": "..." } }
//! ```
//!
//! ## Rate Limit Policies
//!
//! | Policy | Limit | Window | Store failure |
//! |--------|-------|--------|---------------|
//! | `public-read` | 100 | 1 min | allow |
//! | `auth-sensitive` | 5 | 15 min | reject (503) |
//! | `general-api` | 60 | 1 min | allow |
//! | `strict` | 10 | 1 min | allow |
//!
//! `general-api` counts per authenticated user; the others count per client IP.
//!
//! ## Quick Start
//!
//! ```bash
//! JWT_SECRET=your-secure-secret-key
//! RATE_LIMIT_REST_URL=https://kv.example.com
//! RATE_LIMIT_REST_TOKEN=...
//! DEPLOYMENT_MODE=multi
//! ```

pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
