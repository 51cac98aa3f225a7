use anyhow::Context;
use clap::Parser;
use flightdeck::api;
use flightdeck::config::Settings;
use flightdeck::gateway::Gateway;
use flightdeck::startup;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = Settings::parse();
    info!("flightdeck starting: driver={:?}", settings.driver);

    let mut drone = settings.build_drone();

    startup::connect_drone(drone.as_mut()).await?;

    let (gateway, worker) = Gateway::spawn(drone, settings.gateway());
    let app = api::router(gateway);

    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!("API listening on {}", settings.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving API")?;

    // The router (and its gateway handle) is gone; let the worker drain
    let drone = worker.join().await.context("gateway worker panicked")?;
    info!("Gateway stopped, released {} drone", drone.name());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
