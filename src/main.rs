use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use ragline_backend::core::config::{AppPaths, ConfigService};
use ragline_backend::core::logging;
use ragline_backend::server;
use ragline_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::from_env());
    logging::init(&paths.log_dir);

    let config = ConfigService::new(paths.clone());
    match config.ensure_default_config() {
        Ok(true) => tracing::info!("Wrote default config to {}", config.config_path().display()),
        Ok(false) => {}
        Err(err) => tracing::warn!("Failed to write default config: {}", err),
    }

    let state = AppState::initialize(config).context("Failed to initialize application state")?;

    let bind_addr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app = server::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.rate_limiter.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
