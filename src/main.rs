use std::net::SocketAddr;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};

use tastelog::router::init_router;
use tastelog::state::init_app_state;
use tastelog_observability::{init_logging, init_metrics, metrics_app, shutdown_tracer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging()?;

    let state = init_app_state().await?;
    let bind_address = state.server_config.bind_address.clone();

    if let Some(handle) = init_metrics()? {
        let metrics_address =
            std::env::var("METRICS_ADDRESS").unwrap_or_else(|_| "0.0.0.0:9090".to_string());
        tokio::spawn(async move {
            let listener = match TcpListener::bind(&metrics_address).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(address = %metrics_address, error = %e, "Failed to bind metrics listener");
                    return;
                }
            };
            info!(address = %metrics_address, "Metrics available at /metrics");
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let app = init_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Server running");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
