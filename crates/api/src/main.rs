use std::net::SocketAddr;

use anyhow::Context;

use evergiven_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    evergiven_observability::init();

    if let Err(e) = run().await {
        tracing::error!("startup failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let app = evergiven_api::app::build_app(&config)
        .await
        .context("database startup failed")?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;

    tracing::info!("EverGiven API listening on {}", listener.local_addr()?);
    tracing::info!("health check available at http://localhost:{}/health", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
