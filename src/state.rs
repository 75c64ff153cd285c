use std::sync::Arc;

use anyhow::Context;
use tastelog_auth::{IdentityProvider, JwtIdentityProvider, RoleLookup, StaticRoleLookup};
use tastelog_config::{
    CorsConfig, CsrfConfig, JwtConfig, RateLimitConfig, RoleConfig, ServerConfig, TelemetryConfig,
};
use tastelog_core::{HttpSink, TelemetrySink, TracingSink};
use tastelog_ratelimit::{LocalStore, RateLimitStore, build_store};
use tracing::info;

use crate::modules::tastings::service::TastingService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub server_config: ServerConfig,
    pub rate_limit_config: RateLimitConfig,
    pub jwt_config: JwtConfig,
    pub csrf_config: CsrfConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_store: Arc<dyn RateLimitStore>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub role_lookup: Arc<dyn RoleLookup>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub tastings: TastingService,
}

impl AppState {
    /// Default settings with process-local counters and no admins.
    ///
    /// Does not spawn anything, so it can be built outside a runtime.
    pub fn local(telemetry: Arc<dyn TelemetrySink>) -> Self {
        let jwt_config = JwtConfig::default();

        Self {
            server_config: ServerConfig::default(),
            rate_limit_config: RateLimitConfig::default(),
            identity_provider: Arc::new(JwtIdentityProvider::new(jwt_config.clone())),
            jwt_config,
            csrf_config: CsrfConfig::default(),
            cors_config: CorsConfig::default(),
            rate_limit_store: Arc::new(LocalStore::new()),
            role_lookup: Arc::new(StaticRoleLookup::new()),
            telemetry,
            tastings: TastingService::default(),
        }
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let server_config = ServerConfig::from_env();
    let rate_limit_config = RateLimitConfig::from_env();
    let jwt_config = JwtConfig::from_env();
    let telemetry_config = TelemetryConfig::from_env();

    let rate_limit_store = build_store(&rate_limit_config, server_config.deployment_mode).await;

    let telemetry: Arc<dyn TelemetrySink> = match &telemetry_config.endpoint {
        Some(endpoint) => {
            let sink = HttpSink::new(endpoint.clone(), telemetry_config.timeout)
                .context("failed to build telemetry client")?;
            info!(endpoint = %endpoint, "Error reports go to the telemetry endpoint");
            Arc::new(sink)
        }
        None => Arc::new(TracingSink),
    };

    Ok(AppState {
        identity_provider: Arc::new(JwtIdentityProvider::new(jwt_config.clone())),
        role_lookup: Arc::new(StaticRoleLookup::from_config(&RoleConfig::from_env())),
        csrf_config: CsrfConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        server_config,
        rate_limit_config,
        jwt_config,
        rate_limit_store,
        telemetry,
        tastings: TastingService::default(),
    })
}
