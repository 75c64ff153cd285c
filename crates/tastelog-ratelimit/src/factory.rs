//! Store selection at startup.

use std::sync::{Arc, Once};
use std::time::Duration;

use tastelog_config::{DeploymentMode, RateLimitConfig, StoreBackend};
use tracing::{info, warn};

use crate::memory::LocalStore;
use crate::redis::RedisStore;
use crate::rest::RestStore;
use crate::store::RateLimitStore;

static PROCESS_LOCAL_WARNING: Once = Once::new();

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds the configured counter store.
///
/// A shared store that cannot be reached at startup is replaced by a
/// [`LocalStore`] with a warning, so the API keeps serving with per-process limits.
pub async fn build_store(
    config: &RateLimitConfig,
    deployment_mode: DeploymentMode,
) -> Arc<dyn RateLimitStore> {
    let store: Arc<dyn RateLimitStore> = match config.backend() {
        StoreBackend::Rest { url, token } => match connect_rest(&url, &token, config).await {
            Ok(store) => {
                info!(backend = "rest", "Rate limit store connected");
                Arc::new(store)
            }
            Err(e) => {
                warn!(error = %e, "REST rate limit store unreachable, falling back to local counters");
                LocalStore::shared(config.sweep_interval)
            }
        },
        StoreBackend::Redis { url } => {
            let connect_timeout = config.request_timeout.max(REDIS_CONNECT_TIMEOUT);
            match RedisStore::connect(&url, connect_timeout).await {
                Ok(store) => {
                    info!(backend = "redis", "Rate limit store connected");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(error = %e, "Redis rate limit store unreachable, falling back to local counters");
                    LocalStore::shared(config.sweep_interval)
                }
            }
        }
        StoreBackend::Local => {
            info!(backend = "local", "Using process-local rate limit counters");
            LocalStore::shared(config.sweep_interval)
        }
    };

    if store.is_process_local() && deployment_mode.is_multi_instance() {
        warn_process_local_once();
    }

    store
}

async fn connect_rest(
    url: &str,
    token: &str,
    config: &RateLimitConfig,
) -> Result<RestStore, crate::StoreError> {
    let store = RestStore::new(url, token, config.request_timeout, config.retries)?;
    store.ping().await?;
    Ok(store)
}

fn warn_process_local_once() {
    PROCESS_LOCAL_WARNING.call_once(|| {
        warn!(
            "Rate limit counters are process-local but the deployment is multi-instance; \
             each instance enforces its own limits"
        );
    });
}
