//! RateBridge server binary.

use tracing::{error, info};

use ratebridge_server::{app_router, init_tracing, shutdown_signal, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    init_tracing(&config);

    info!(environment = %config.environment, "Starting RateBridge");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let addr = config.socket_addr();
    let state = AppState::new(config);
    let router = app_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        listen_addr = %addr,
        rates_mode = %state.engine.mode(),
        "RateBridge listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("RateBridge shutdown complete");
    Ok(())
}
