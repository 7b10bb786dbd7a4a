use std::sync::Arc;

use anyhow::Context;

use grouppurge_api::app::{self, services};
use grouppurge_api::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    grouppurge_observability::init();

    let settings = Settings::from_env();
    let services = Arc::new(services::build_services(&settings).context("failed to build services")?);
    let reaper = settings.reaper.spawn(services.runner.store().clone());

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    reaper.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
